//! # Task Optimizer Module
//!
//! Worker per la minificazione di un singolo work item.
//! Compone DirectoryEnsurer → CompressionPipeline → SavingsEvaluator →
//! OverwritePolicy e converte ogni errore in un `FileFailure`, così un file
//! rotto non interrompe mai il resto del batch.

use crate::{
    config::CodecOptions,
    error::{ErrorKind, MinifyError},
    events::{BatchEvent, EventSink},
    file_manager::FileManager,
    optimizer::{
        path_resolver::{PathResolver, WorkItem},
        pipeline::{CompressionPipeline, CompressionResult},
        savings::{Savings, SavingsEvaluator},
    },
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Successful processing of one work item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub item: WorkItem,
    pub original_size: u64,
    pub compressed_size: u64,
    pub savings: Savings,
    pub overwritten: bool,
}

impl FileReport {
    pub fn saved_bytes(&self) -> i64 {
        self.savings.saved_bytes()
    }

    pub fn saved_percent(&self) -> u64 {
        self.savings.saved_percent()
    }
}

/// Failed processing of one work item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub item: WorkItem,
    pub kind: ErrorKind,
    pub message: String,
}

/// Terminal state of one work item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingOutcome {
    Completed(FileReport),
    Failed(FileFailure),
}

impl ProcessingOutcome {
    pub fn item(&self) -> &WorkItem {
        match self {
            Self::Completed(report) => &report.item,
            Self::Failed(failure) => &failure.item,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Failure record for an item that never produced an outcome itself
    pub fn failed(item: WorkItem, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed(FileFailure {
            item,
            kind,
            message: message.into(),
        })
    }
}

/// Copia l'output minificato sopra il sorgente quando richiesto
pub struct OverwritePolicy;

impl OverwritePolicy {
    /// Solo con `overwrite` attivo e risultato `Improved`
    pub fn should_overwrite(overwrite: bool, savings: &Savings) -> bool {
        overwrite && savings.is_improved()
    }

    /// Returns whether the source was replaced
    pub async fn apply(
        overwrite: bool,
        savings: &Savings,
        result: &CompressionResult,
        source: &Path,
        sink: &dyn EventSink,
    ) -> Result<bool, MinifyError> {
        if !Self::should_overwrite(overwrite, savings) {
            return Ok(false);
        }

        FileManager::replace_file(source, &result.output_path).await?;
        sink.emit(&BatchEvent::Overwritten {
            path: source.to_path_buf(),
        });
        Ok(true)
    }
}

/// Worker per elaborazione singoli file
#[derive(Clone)]
pub struct TaskOptimizer {
    pipeline: Arc<CompressionPipeline>,
    options: CodecOptions,
    overwrite: bool,
    sink: Arc<dyn EventSink>,
}

impl TaskOptimizer {
    pub fn new(
        pipeline: Arc<CompressionPipeline>,
        options: CodecOptions,
        overwrite: bool,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            pipeline,
            options,
            overwrite,
            sink,
        }
    }

    /// Processa un singolo work item; non fallisce mai, l'errore finisce nell'outcome
    pub async fn process(&self, item: WorkItem) -> ProcessingOutcome {
        match self.try_process(&item).await {
            Ok(report) => ProcessingOutcome::Completed(report),
            Err(e) => {
                let failure = FileFailure {
                    kind: e.kind(),
                    message: e.to_string(),
                    item,
                };
                self.sink.emit(&BatchEvent::FileFailed {
                    path: failure.item.source.clone(),
                    kind: failure.kind,
                    message: failure.message.clone(),
                });
                ProcessingOutcome::Failed(failure)
            }
        }
    }

    async fn try_process(&self, item: &WorkItem) -> Result<FileReport, MinifyError> {
        let sink = self.sink.as_ref();

        PathResolver::ensure_parent_dirs(&item.destination, sink).await?;

        let result = self.pipeline.compress(item, &self.options).await?;

        let savings = SavingsEvaluator::evaluate(result.original_size, result.output_size);
        sink.emit(&BatchEvent::FileEvaluated {
            path: item.source.clone(),
            original_size: result.original_size,
            compressed_size: result.output_size,
            savings,
        });

        let overwritten =
            OverwritePolicy::apply(self.overwrite, &savings, &result, &item.source, sink).await?;

        Ok(FileReport {
            item: item.clone(),
            original_size: result.original_size,
            compressed_size: result.output_size,
            savings,
            overwritten,
        })
    }
}
