//! # Batch Events Module
//!
//! Questo modulo definisce gli eventi emessi durante un batch e la capability
//! di logging che li riceve.
//!
//! ## Responsabilità:
//! - `BatchEvent`: Tutti gli eventi osservabili di un batch (debug/info/success/error)
//! - `EventSink`: Trait passato esplicitamente a ogni componente, niente logger globale
//! - `TracingSink`: Inoltra gli eventi alle macro di `tracing`
//! - `MemorySink`: Cattura gli eventi in memoria (test e consumer programmatici)
//!
//! Il sink JSON per la comunicazione inter-processo vive in `json_output`.
//!
//! ## Esempio:
//! ```rust,ignore
//! let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
//! sink.emit(&BatchEvent::DirectoryCreated { path: dir.to_path_buf() });
//! ```

use crate::error::ErrorKind;
use crate::optimizer::path_resolver::WorkItem;
use crate::optimizer::savings::Savings;
use crate::progress::BatchStats;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, error, info};

/// Severity of a batch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Success,
    Error,
}

/// Evento emesso durante un batch di minificazione
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// Inizio del batch, dopo la scansione del source tree
    BatchStarted {
        source_dir: PathBuf,
        compiled_dir: PathBuf,
        total_files: usize,
        concurrency_limit: usize,
        overwrite: bool,
    },

    /// Work item calcolati dal path resolver
    WorkItemsResolved { items: Vec<WorkItem> },

    /// Directory di destinazione creata
    DirectoryCreated { path: PathBuf },

    /// Risultato della valutazione dei byte risparmiati
    FileEvaluated {
        path: PathBuf,
        original_size: u64,
        compressed_size: u64,
        savings: Savings,
    },

    /// Sorgente sovrascritto con l'output minificato
    Overwritten { path: PathBuf },

    /// Elaborazione di un file fallita
    FileFailed {
        path: PathBuf,
        kind: ErrorKind,
        message: String,
    },

    /// Tutti i file hanno raggiunto uno stato terminale
    BatchCompleted {
        stats: BatchStats,
        duration_seconds: f64,
    },
}

impl BatchEvent {
    pub fn level(&self) -> EventLevel {
        match self {
            Self::WorkItemsResolved { .. } | Self::DirectoryCreated { .. } => EventLevel::Debug,
            Self::BatchStarted { .. } | Self::FileEvaluated { .. } | Self::BatchCompleted { .. } => {
                EventLevel::Info
            }
            Self::Overwritten { .. } => EventLevel::Success,
            Self::FileFailed { .. } => EventLevel::Error,
        }
    }

    /// Human-readable rendering of the event
    pub fn message(&self) -> String {
        match self {
            Self::BatchStarted {
                source_dir,
                compiled_dir,
                total_files,
                concurrency_limit,
                overwrite,
            } => format!(
                "Minifying {} images from [[ {} ]] to [[ {} ]] ({} workers{})",
                total_files,
                source_dir.display(),
                compiled_dir.display(),
                concurrency_limit,
                if *overwrite { ", overwriting sources" } else { "" }
            ),
            Self::WorkItemsResolved { items } => {
                let json = serde_json::to_string_pretty(items).unwrap_or_default();
                format!("minify-img configs ({} items)\n{}", items.len(), json)
            }
            Self::DirectoryCreated { path } => format!("Making folder [[ {} ]]", path.display()),
            Self::FileEvaluated { path, savings, .. } => savings.report(path),
            Self::Overwritten { path } => format!(
                "Wrote minified image back to source destination [[ {} ]]",
                path.display()
            ),
            Self::FileFailed { path, message, .. } => {
                format!("minify-img could not minify [[ {} ]], {}", path.display(), message)
            }
            Self::BatchCompleted {
                stats,
                duration_seconds,
            } => format!("{} in {:.2}s", stats.format_summary(), duration_seconds),
        }
    }
}

/// Logging capability threaded through every component
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BatchEvent);
}

/// Sink che inoltra gli eventi al subscriber `tracing` installato dal binario
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &BatchEvent) {
        match event.level() {
            EventLevel::Debug => {
                // evita di serializzare i work item se il debug è spento
                if tracing::enabled!(tracing::Level::DEBUG) {
                    debug!("{}", event.message());
                }
            }
            EventLevel::Info => info!("{}", event.message()),
            EventLevel::Success => info!(success = true, "{}", event.message()),
            EventLevel::Error => error!("{}", event.message()),
        }
    }
}

/// Captures events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<BatchEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event received so far
    pub fn events(&self) -> Vec<BatchEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().iter().map(BatchEvent::message).collect()
    }

    pub fn count(&self, level: EventLevel) -> usize {
        self.events().iter().filter(|e| e.level() == level).count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &BatchEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
