//! # Image Minifier Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore del batch
//! - `events`: Eventi del batch e sink di logging
//! - `file_manager`: Discovery dei file e operazioni sul filesystem
//! - `codec`: Codec lossless esterni (jpegtran, gifsicle, optipng)
//! - `tool_resolver`: Ricerca dei binari dei codec
//! - `optimizer`: Orchestratore, scheduler e pipeline per file
//! - `progress`: Progress bar e statistiche
//! - `json_output`: Eventi JSON line-delimited per altri processi
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use image_minifier::{Config, ImageMinifier, TracingSink};
//!
//! let config = Config::default();
//! let report = ImageMinifier::new(config, Arc::new(TracingSink)).run().await?;
//! println!("{}", report.stats.format_summary());
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod file_manager;
pub mod json_output;
pub mod optimizer;
pub mod progress;
pub mod tool_resolver;
pub mod utils;

pub use codec::{Codec, ImageKind};
pub use config::{CodecOptions, Config};
pub use error::{ErrorKind, MinifyError};
pub use events::{BatchEvent, EventLevel, EventSink, MemorySink, TracingSink};
pub use json_output::JsonSink;
pub use optimizer::{BatchReport, ImageMinifier, ProcessingOutcome, WorkItem};
pub use progress::BatchStats;
pub use tool_resolver::ToolPathResolver;
