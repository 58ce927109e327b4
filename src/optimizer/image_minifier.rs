//! # Image Minifier Main Orchestrator
//!
//! Orchestratore principale che delega responsabilità ai moduli specializzati:
//! risolve i work item, li passa allo scheduler e aggrega gli outcome.
//!
//! ## Flusso:
//! 1. Validazione della configurazione (errore → batch non parte)
//! 2. Scansione del source tree (errore → batch non parte)
//! 3. Elaborazione concorrente con `ConcurrencyScheduler` + `TaskOptimizer`
//! 4. Statistiche finali e `BatchReport`

use crate::{
    config::Config,
    error::{ErrorKind, MinifyError},
    events::{BatchEvent, EventSink},
    optimizer::{
        path_resolver::PathResolver,
        pipeline::CompressionPipeline,
        scheduler::ConcurrencyScheduler,
        task_optimizer::{ProcessingOutcome, TaskOptimizer},
    },
    progress::{BatchStats, ProgressManager},
    tool_resolver::ToolPathResolver,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Everything a finished batch produced
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<ProcessingOutcome>,
    pub stats: BatchStats,
    pub duration: Duration,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }
}

/// Entry point for one batch run
pub struct ImageMinifier {
    config: Config,
    sink: Arc<dyn EventSink>,
    pipeline: Option<CompressionPipeline>,
    show_progress: bool,
    stop_receiver: Option<broadcast::Receiver<()>>,
}

impl ImageMinifier {
    pub fn new(config: Config, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            sink,
            pipeline: None,
            show_progress: false,
            stop_receiver: None,
        }
    }

    /// Use a custom pipeline instead of the external codec tools
    pub fn with_pipeline(mut self, pipeline: CompressionPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Draw an `indicatif` progress bar while the batch runs
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn with_cancellation(mut self, stop_receiver: broadcast::Receiver<()>) -> Self {
        self.stop_receiver = Some(stop_receiver);
        self
    }

    /// Esegue il batch di minificazione
    pub async fn run(self) -> Result<BatchReport, MinifyError> {
        let start_time = Instant::now();
        let Self {
            config,
            sink,
            pipeline,
            show_progress,
            stop_receiver,
        } = self;

        config.validate()?;

        let items = PathResolver::resolve_config(&config, sink.as_ref())?;

        sink.emit(&BatchEvent::BatchStarted {
            source_dir: config.source_dir.clone(),
            compiled_dir: config.compiled_dir.clone(),
            total_files: items.len(),
            concurrency_limit: config.concurrency_limit,
            overwrite: config.overwrite,
        });

        let pipeline = pipeline.unwrap_or_else(|| {
            CompressionPipeline::new(
                &ToolPathResolver::new(),
                Duration::from_secs(config.codec_timeout_secs),
            )
        });

        let progress = Arc::new(if show_progress {
            ProgressManager::new(items.len() as u64)
        } else {
            ProgressManager::hidden()
        });

        let task_optimizer = TaskOptimizer::new(
            Arc::new(pipeline),
            config.options.clone(),
            config.overwrite,
            sink.clone(),
        );

        let mut scheduler = ConcurrencyScheduler::new(config.concurrency_limit);
        if let Some(receiver) = stop_receiver {
            scheduler = scheduler.with_cancellation(receiver);
        }

        let task_progress = progress.clone();
        let outcomes = scheduler
            .run(items, move |item| {
                let task_optimizer = task_optimizer.clone();
                let progress = task_progress.clone();
                async move {
                    let outcome = task_optimizer.process(item).await;
                    progress.record(&outcome);
                    outcome
                }
            })
            .await;

        // il worker riporta da solo i propri errori, questi no
        for outcome in &outcomes {
            if let ProcessingOutcome::Failed(failure) = outcome {
                if matches!(failure.kind, ErrorKind::Cancelled | ErrorKind::Internal) {
                    sink.emit(&BatchEvent::FileFailed {
                        path: failure.item.source.clone(),
                        kind: failure.kind,
                        message: failure.message.clone(),
                    });
                }
            }
        }

        let stats = BatchStats::from_outcomes(&outcomes);
        let duration = start_time.elapsed();

        progress.finish(&stats.format_summary());
        sink.emit(&BatchEvent::BatchCompleted {
            stats: stats.clone(),
            duration_seconds: duration.as_secs_f64(),
        });

        Ok(BatchReport {
            outcomes,
            stats,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, ImageKind};
    use crate::events::{EventLevel, MemorySink};
    use crate::optimizer::pipeline::test_codecs::*;
    use std::collections::BTreeSet;
    use std::path::Path;
    use tempfile::TempDir;

    fn config_for(root: &Path, exts: &[&str]) -> Config {
        Config {
            source_dir: root.join("src"),
            compiled_dir: root.join("dist"),
            extensions: exts.iter().map(|e| e.to_string()).collect::<BTreeSet<_>>(),
            concurrency_limit: 2,
            ..Config::default()
        }
    }

    fn trim_pipeline(trim: usize) -> CompressionPipeline {
        CompressionPipeline::with_codecs(
            vec![Arc::new(TrimCodec {
                kind: ImageKind::Png,
                trim,
            }) as Arc<dyn Codec>],
            Duration::from_secs(5),
        )
    }

    fn write(root: &Path, rel: &str, bytes: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[tokio::test]
    async fn test_end_to_end_mirrors_matching_files_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.png", &fake_png(10_000));
        write(dir.path(), "src/sub/b.txt", b"hello");
        let sink = Arc::new(MemorySink::new());

        let report = ImageMinifier::new(config_for(dir.path(), &["png"]), sink.clone())
            .with_pipeline(trim_pipeline(1_000))
            .run()
            .await
            .unwrap();

        let output = dir.path().join("dist/a.png");
        assert!(output.exists());
        assert!(std::fs::metadata(&output).unwrap().len() <= 10_000);
        assert!(!dir.path().join("dist/sub").exists());

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.stats.succeeded, 1);
        assert_eq!(report.stats.improved, 1);
        assert!(!report.has_failures());

        let messages = sink.messages();
        assert!(messages
            .iter()
            .any(|m| m.contains("a.png") && (m.contains("did not change") || m.contains("% ("))));
        assert!(matches!(
            sink.events().last(),
            Some(BatchEvent::BatchCompleted { .. })
        ));
    }

    #[tokio::test]
    async fn test_second_run_produces_identical_tree() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.png", &fake_png(4_000));
        write(dir.path(), "src/deep/c.png", &fake_png(2_500));

        let mut snapshots = Vec::new();
        for _ in 0..2 {
            ImageMinifier::new(config_for(dir.path(), &["png"]), Arc::new(MemorySink::new()))
                .with_pipeline(trim_pipeline(300))
                .run()
                .await
                .unwrap();
            snapshots.push((
                std::fs::read(dir.path().join("dist/a.png")).unwrap(),
                std::fs::read(dir.path().join("dist/deep/c.png")).unwrap(),
            ));
        }

        assert_eq!(snapshots[0], snapshots[1]);
    }

    #[tokio::test]
    async fn test_one_broken_file_does_not_stop_the_batch() {
        let dir = TempDir::new().unwrap();
        for i in 1..=5 {
            let mut bytes = fake_png(200);
            if i == 3 {
                bytes.push(0xEE);
            }
            write(dir.path(), &format!("src/{}.png", i), &bytes);
        }
        let sink = Arc::new(MemorySink::new());
        let pipeline = CompressionPipeline::with_codecs(
            vec![Arc::new(FailingCodec { marker: 0xEE }) as Arc<dyn Codec>],
            Duration::from_secs(5),
        );

        let report = ImageMinifier::new(config_for(dir.path(), &["png"]), sink.clone())
            .with_pipeline(pipeline)
            .run()
            .await
            .unwrap();

        assert_eq!(report.stats.succeeded, 4);
        assert_eq!(report.stats.failed, 1);
        assert!(report.has_failures());
        assert_eq!(sink.count(EventLevel::Error), 1);
        assert!(!dir.path().join("dist/3.png").exists());
    }

    #[tokio::test]
    async fn test_overwrite_writes_back_improved_sources() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.png", &fake_png(1_000));
        let mut config = config_for(dir.path(), &["png"]);
        config.overwrite = true;

        let report = ImageMinifier::new(config, Arc::new(MemorySink::new()))
            .with_pipeline(trim_pipeline(200))
            .run()
            .await
            .unwrap();

        assert_eq!(report.stats.overwritten, 1);
        assert_eq!(std::fs::metadata(dir.path().join("src/a.png")).unwrap().len(), 800);
    }

    #[tokio::test]
    async fn test_cancelled_batch_marks_items() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.png", &fake_png(500));
        write(dir.path(), "src/b.png", &fake_png(500));
        let (sender, receiver) = ConcurrencyScheduler::create_cancellation_channel();
        sender.send(()).unwrap();
        let sink = Arc::new(MemorySink::new());

        let report = ImageMinifier::new(config_for(dir.path(), &["png"]), sink.clone())
            .with_pipeline(trim_pipeline(100))
            .with_cancellation(receiver)
            .run()
            .await
            .unwrap();

        assert_eq!(report.stats.cancelled, 2);
        assert_eq!(report.stats.failed, 2);
        assert_eq!(sink.count(EventLevel::Error), 2);
        assert!(!dir.path().join("dist/a.png").exists());
    }

    #[tokio::test]
    async fn test_empty_tree_completes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();

        let report = ImageMinifier::new(config_for(dir.path(), &["png"]), Arc::new(MemorySink::new()))
            .with_pipeline(trim_pipeline(0))
            .run()
            .await
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert_eq!(report.stats, BatchStats::default());
    }

    #[tokio::test]
    async fn test_missing_source_dir_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let err = ImageMinifier::new(config_for(dir.path(), &["png"]), Arc::new(MemorySink::new()))
            .with_pipeline(trim_pipeline(0))
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[tokio::test]
    async fn test_compiled_dir_spelled_as_source_leaves_sources_alone() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.png", &fake_png(1_000));
        let mut config = config_for(dir.path(), &["png"]);
        config.compiled_dir = dir.path().join("src/../src");

        let err = ImageMinifier::new(config, Arc::new(MemorySink::new()))
            .with_pipeline(trim_pipeline(100))
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(std::fs::read(dir.path().join("src/a.png")).unwrap(), fake_png(1_000));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_scan() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(dir.path(), &["png"]);
        config.concurrency_limit = 0;
        let sink = Arc::new(MemorySink::new());

        let err = ImageMinifier::new(config, sink.clone()).run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(sink.events().is_empty());
    }
}
