//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore custom della libreria.
//!
//! ## Categorie di errori:
//! - `Filesystem`: Errori di I/O (source tree mancante, permessi, conflitti di tipo path)
//! - `Codec`: Un file non può essere compresso dal codec corrispondente
//! - `Configuration`: Configurazione malformata, rilevata prima di qualsiasi elaborazione
//!
//! ## Politica di propagazione:
//! - Errori di scan e di configurazione interrompono l'intero batch
//! - Errori per singolo file vengono convertiti in `FileFailure` e non
//!   bloccano gli altri file
//!
//! ## Esempio:
//! ```rust,ignore
//! if config.concurrency_limit == 0 {
//!     return Err(MinifyError::Configuration("concurrency limit must be positive".into()));
//! }
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Custom error types for image minification
#[derive(thiserror::Error, Debug)]
pub enum MinifyError {
    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not minify {}: {message}", .path.display())]
    Codec { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MinifyError {
    pub fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn codec(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Codec {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::Codec { .. } => ErrorKind::Codec,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Categoria di un fallimento registrato in un outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Filesystem,
    Codec,
    Configuration,
    /// Item never admitted because the batch was cancelled
    Cancelled,
    /// The worker task panicked
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Filesystem => "filesystem",
            Self::Codec => "codec",
            Self::Configuration => "configuration",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}
