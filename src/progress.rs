//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche aggregate di un batch.
//!
//! ## Responsabilità:
//! - Progress bar visuale con `indicatif` (opzionale, flag `--progress`)
//! - Tracking delle statistiche del batch (successi, fallimenti, byte risparmiati)
//! - Calcolo della percentuale di riduzione complessiva
//! - Riepilogo finale con il conteggio di file riusciti e falliti
//!
//! ## Statistiche tracciate:
//! - **succeeded**: File arrivati a `Completed`
//! - **failed**: File arrivati a `Failed` (inclusi i cancellati)
//! - **improved** / **unchanged**: Classificazione del SavingsEvaluator
//! - **overwritten**: Sorgenti sovrascritti
//! - **cancelled**: File mai ammessi per cancellazione del batch
//! - **total_original_size** / **total_bytes_saved**: Byte dei file completati
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:04] [========================>---------------] 38/60 (63%) [OK] logo.png: 12% saved
//! ```

use crate::error::ErrorKind;
use crate::file_manager::FileManager;
use crate::optimizer::savings::Savings;
use crate::optimizer::task_optimizer::ProcessingOutcome;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Manages the optional progress bar for a batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a visible progress bar
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        // template statico, non può fallire
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager che non disegna nulla
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Advance by one file and describe its outcome
    pub fn record(&self, outcome: &ProcessingOutcome) {
        let item = outcome.item();
        let name = item
            .source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        let message = match outcome {
            ProcessingOutcome::Completed(report) => match report.savings {
                Savings::Improved { saved_percent, .. } => {
                    format!("[OK] {}: {}% saved", name, saved_percent)
                }
                Savings::Unchanged { .. } => format!("[SKIP] {}: already minified", name),
            },
            ProcessingOutcome::Failed(failure) => format!("[ERROR] {}: {}", name, failure.kind),
        };

        self.bar.inc(1);
        self.bar.set_message(message);
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Aggregate tallies for one batch run
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub improved: usize,
    pub unchanged: usize,
    pub overwritten: usize,
    pub cancelled: usize,
    pub total_original_size: u64,
    pub total_bytes_saved: u64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_outcomes(outcomes: &[ProcessingOutcome]) -> Self {
        let mut stats = Self::new();
        for outcome in outcomes {
            stats.add(outcome);
        }
        stats
    }

    pub fn add(&mut self, outcome: &ProcessingOutcome) {
        self.total += 1;
        match outcome {
            ProcessingOutcome::Completed(report) => {
                self.succeeded += 1;
                self.total_original_size += report.original_size;
                match report.savings {
                    Savings::Improved { saved_bytes, .. } => {
                        self.improved += 1;
                        self.total_bytes_saved += saved_bytes;
                    }
                    Savings::Unchanged { .. } => self.unchanged += 1,
                }
                if report.overwritten {
                    self.overwritten += 1;
                }
            }
            ProcessingOutcome::Failed(failure) => {
                self.failed += 1;
                if failure.kind == ErrorKind::Cancelled {
                    self.cancelled += 1;
                }
            }
        }
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Succeeded: {} | Failed: {} | Minified: {} | Unchanged: {} | Overwritten: {} | Total saved: {} ({:.2}%)",
            self.total,
            self.succeeded,
            self.failed,
            self.improved,
            self.unchanged,
            self.overwritten,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::path_resolver::WorkItem;
    use crate::optimizer::savings::SavingsEvaluator;
    use crate::optimizer::task_optimizer::{FileFailure, FileReport};

    fn item(name: &str) -> WorkItem {
        WorkItem {
            source: format!("/src/{}", name).into(),
            destination: format!("/dist/{}", name).into(),
        }
    }

    fn completed(name: &str, original: u64, compressed: u64, overwritten: bool) -> ProcessingOutcome {
        ProcessingOutcome::Completed(FileReport {
            item: item(name),
            original_size: original,
            compressed_size: compressed,
            savings: SavingsEvaluator::evaluate(original, compressed),
            overwritten,
        })
    }

    #[test]
    fn test_stats_tally() {
        let outcomes = vec![
            completed("a.png", 1000, 500, true),
            completed("b.png", 1000, 995, false),
            ProcessingOutcome::Failed(FileFailure {
                item: item("c.png"),
                kind: ErrorKind::Codec,
                message: "boom".into(),
            }),
            ProcessingOutcome::Failed(FileFailure {
                item: item("d.png"),
                kind: ErrorKind::Cancelled,
                message: "cancelled".into(),
            }),
        ];

        let stats = BatchStats::from_outcomes(&outcomes);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.improved, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.overwritten, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total_original_size, 2000);
        assert_eq!(stats.total_bytes_saved, 500);
        assert!((stats.overall_reduction_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_mentions_tallies() {
        let stats = BatchStats::from_outcomes(&[completed("a.png", 2048, 1024, false)]);
        let summary = stats.format_summary();
        assert!(summary.contains("Succeeded: 1"));
        assert!(summary.contains("Failed: 0"));
        assert!(summary.contains("1.00 KB"));
    }

    #[test]
    fn test_hidden_progress_counts_files() {
        let progress = ProgressManager::hidden();
        progress.record(&completed("a.png", 100, 50, false));
        progress.record(&completed("b.png", 100, 100, false));
        assert_eq!(progress.position(), 2);
    }
}
