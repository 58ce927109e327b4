//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione di un batch di minificazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del batch
//! - Definisce `CodecOptions` con i parametri dei singoli codec lossless
//! - Fornisce validazione dei parametri prima di qualsiasi elaborazione
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri di configurazione:
//! - `sourceDir`: Directory sorgente da scansionare (default: "assets")
//! - `compiledDir`: Directory di output speculare (default: "public")
//! - `exts`: Estensioni di interesse (default: gif, jpeg, jpg, png)
//! - `options.interlaced`: GIF interlacciate (default: false)
//! - `options.progressive`: JPEG progressivi (default: false)
//! - `options.optimizationLevel`: Livello optipng 0-7 (default: 2)
//! - `concurrencyLimit`: File elaborati in parallelo (default: CPU logiche)
//! - `codecTimeoutSecs`: Timeout per singola invocazione codec (default: 120)
//!
//! `overwrite` non viene mai letto né scritto su file: si attiva solo con
//! il flag `--overwrite` da command line.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     source_dir: "assets".into(),
//!     compiled_dir: "public".into(),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::MinifyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Extensions the codec pipeline knows how to handle
pub const KNOWN_EXTENSIONS: &[&str] = &["gif", "jpeg", "jpg", "png"];

/// Highest optipng optimization level
pub const MAX_OPTIMIZATION_LEVEL: u8 = 7;

/// Per-format lossless codec tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodecOptions {
    /// Interlace GIF output
    pub interlaced: bool,
    /// Progressive JPEG encoding
    pub progressive: bool,
    /// PNG optimization effort (0-7)
    pub optimization_level: u8,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            interlaced: false,
            progressive: false,
            optimization_level: 2,
        }
    }
}

/// Configuration for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Root of the tree to scan
    pub source_dir: PathBuf,
    /// Root of the mirrored output tree
    pub compiled_dir: PathBuf,
    /// Extensions of interest, lowercase without the leading dot
    #[serde(rename = "exts")]
    pub extensions: BTreeSet<String>,
    /// Codec tunables
    pub options: CodecOptions,
    /// Copy improved output back over the source file
    #[serde(skip)]
    pub overwrite: bool,
    /// Maximum number of files in flight
    pub concurrency_limit: usize,
    /// Timeout for a single codec invocation, in seconds
    pub codec_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("assets"),
            compiled_dir: PathBuf::from("public"),
            extensions: KNOWN_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            options: CodecOptions::default(),
            overwrite: false,
            concurrency_limit: default_concurrency(),
            codec_timeout_secs: 120,
        }
    }
}

/// Path assoluto con symlink e `..` risolti anche se la coda non esiste ancora.
///
/// Canonicalizza l'antenato esistente più profondo e riattacca i componenti
/// mancanti.
pub fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    let mut resolved = loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            break canonical;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            // `..` finale o root irrisolvibile: normalizzazione solo lessicale
            _ => break PathBuf::new(),
        }
    };

    if resolved.as_os_str().is_empty() {
        for component in absolute.components() {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::CurDir => {}
                other => resolved.push(other),
            }
        }
        return resolved;
    }

    resolved.extend(missing.into_iter().rev());
    resolved
}

/// Numero di CPU logiche, con fallback a 4 se non determinabile
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), MinifyError> {
        if self.concurrency_limit == 0 {
            return Err(MinifyError::Configuration(
                "Concurrency limit must be greater than 0".to_string(),
            ));
        }

        if self.options.optimization_level > MAX_OPTIMIZATION_LEVEL {
            return Err(MinifyError::Configuration(format!(
                "PNG optimization level must be between 0 and {}",
                MAX_OPTIMIZATION_LEVEL
            )));
        }

        if self.codec_timeout_secs == 0 {
            return Err(MinifyError::Configuration(
                "Codec timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.extensions.is_empty() {
            return Err(MinifyError::Configuration(
                "At least one file extension must be configured".to_string(),
            ));
        }

        for ext in &self.extensions {
            if !KNOWN_EXTENSIONS.contains(&ext.as_str()) {
                return Err(MinifyError::Configuration(format!(
                    "Unknown extension '{}' (supported: {})",
                    ext,
                    KNOWN_EXTENSIONS.join(", ")
                )));
            }
        }

        if self.source_dir.as_os_str().is_empty() || self.compiled_dir.as_os_str().is_empty() {
            return Err(MinifyError::Configuration(
                "Source and compiled directories must both be set".to_string(),
            ));
        }

        // Con directory coincidenti la pipeline cancellerebbe il sorgente prima di leggerlo
        let source = resolve_existing_prefix(&self.source_dir);
        let compiled = resolve_existing_prefix(&self.compiled_dir);
        if source == compiled {
            return Err(MinifyError::Configuration(format!(
                "Compiled directory must differ from source directory: {}",
                self.source_dir.display()
            )));
        }
        if source.starts_with(&compiled) || compiled.starts_with(&source) {
            return Err(MinifyError::Configuration(format!(
                "Source directory {} and compiled directory {} must not contain each other",
                self.source_dir.display(),
                self.compiled_dir.display()
            )));
        }

        Ok(())
    }

    /// Load configuration from file; a missing file is a filesystem error
    pub async fn from_file(path: &Path) -> Result<Self, MinifyError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MinifyError::filesystem(path, e))?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            MinifyError::Configuration(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<(), MinifyError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MinifyError::Configuration(format!("Cannot serialize config: {}", e)))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| MinifyError::filesystem(path, e))?;
        Ok(())
    }
}
