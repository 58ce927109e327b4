//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery delle immagini.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva dei file con estensione di interesse
//! - Sostituzione sicura di un file con backup e rollback
//! - Formattazione human-readable delle dimensioni
//!
//! ## Regole di discovery:
//! - Solo file regolari (symlink e directory esclusi)
//! - Estensione = sottostringa dopo l'ultimo `.`, confronto case-sensitive
//! - File senza estensione esclusi
//! - Ordine deterministico: entry ordinate per nome in ogni directory
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_matching_files(Path::new("assets"), &extensions)?;
//! ```

use crate::error::MinifyError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find all regular files under `root` whose extension is in `extensions`
    pub fn find_matching_files(
        root: &Path,
        extensions: &BTreeSet<String>,
    ) -> Result<Vec<PathBuf>, MinifyError> {
        let metadata = std::fs::metadata(root).map_err(|e| MinifyError::filesystem(root, e))?;
        if !metadata.is_dir() {
            return Err(MinifyError::filesystem(
                root,
                std::io::Error::other("source path is not a directory"),
            ));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                MinifyError::filesystem(path, source)
            })?;

            // senza follow_links il file_type di un symlink resta symlink
            if entry.file_type().is_file() && Self::has_extension(entry.path(), extensions) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Check the extension of a path against the configured set (case-sensitive)
    pub fn has_extension(path: &Path, extensions: &BTreeSet<String>) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.contains(ext))
            .unwrap_or(false)
    }

    /// Safely replace a file with its minified version
    ///
    /// The backup is an anonymous temp file next to the original, removed on drop.
    pub async fn replace_file(original: &Path, minified: &Path) -> Result<(), MinifyError> {
        let dir = original
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // Create backup first
        let backup = tempfile::Builder::new()
            .prefix(".minimage-backup-")
            .tempfile_in(dir)
            .map_err(|e| MinifyError::filesystem(dir, e))?;

        fs::copy(original, backup.path())
            .await
            .map_err(|e| MinifyError::filesystem(backup.path(), e))?;

        match fs::copy(minified, original).await {
            Ok(_) => Ok(()),
            Err(e) => {
                // Failure - restore from backup
                let _ = fs::copy(backup.path(), original).await;
                Err(MinifyError::filesystem(original, e))
            }
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
