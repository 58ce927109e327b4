//! # Optimizer Module
//!
//! Separa le responsabilità del batch in sottomoduli:
//! - `image_minifier`: Orchestratore principale
//! - `scheduler`: Pool di worker limitato da semaforo
//! - `task_optimizer`: Worker per singoli file + overwrite policy
//! - `pipeline`: Codec lossless per il formato rilevato
//! - `savings`: Soglia di rumore e report dei byte risparmiati
//! - `path_resolver`: Logica di calcolo path e creazione directory

pub mod image_minifier;
pub mod path_resolver;
pub mod pipeline;
pub mod savings;
pub mod scheduler;
pub mod task_optimizer;

pub use image_minifier::{BatchReport, ImageMinifier};
pub use path_resolver::{PathResolver, WorkItem};
pub use pipeline::{CompressionPipeline, CompressionResult};
pub use savings::{Savings, SavingsEvaluator, NOISE_FLOOR_BYTES};
pub use scheduler::ConcurrencyScheduler;
pub use task_optimizer::{FileFailure, FileReport, OverwritePolicy, ProcessingOutcome, TaskOptimizer};
