//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output e la creazione delle directory.
//! - `PathResolver::resolve`: scansione del source tree → work item
//! - `PathResolver::ensure_dir`: creazione idempotente della catena di directory

use crate::{
    config::Config,
    error::MinifyError,
    events::{BatchEvent, EventSink},
    file_manager::FileManager,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One source → destination processing unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Scansiona `source_dir` e costruisce i work item in ordine di traversal
    pub fn resolve(
        source_dir: &Path,
        compiled_dir: &Path,
        extensions: &BTreeSet<String>,
        sink: &dyn EventSink,
    ) -> Result<Vec<WorkItem>, MinifyError> {
        let items = FileManager::find_matching_files(source_dir, extensions)?
            .into_iter()
            .map(|source| {
                let destination = Self::get_output_path(&source, source_dir, compiled_dir)?;
                Ok(WorkItem {
                    source,
                    destination,
                })
            })
            .collect::<Result<Vec<_>, MinifyError>>()?;

        sink.emit(&BatchEvent::WorkItemsResolved {
            items: items.clone(),
        });

        Ok(items)
    }

    /// Shortcut reading roots and extensions from a config
    pub fn resolve_config(config: &Config, sink: &dyn EventSink) -> Result<Vec<WorkItem>, MinifyError> {
        Self::resolve(
            &config.source_dir,
            &config.compiled_dir,
            &config.extensions,
            sink,
        )
    }

    /// Sostituisce il prefisso `source_dir` con `compiled_dir`
    pub fn get_output_path(
        input_path: &Path,
        source_dir: &Path,
        compiled_dir: &Path,
    ) -> Result<PathBuf, MinifyError> {
        let relative = input_path.strip_prefix(source_dir).map_err(|_| {
            MinifyError::filesystem(
                input_path,
                std::io::Error::other(format!(
                    "path is not inside source directory {}",
                    source_dir.display()
                )),
            )
        })?;

        Ok(compiled_dir.join(relative))
    }

    /// Crea le directory parent di `path` se necessario
    pub async fn ensure_parent_dirs(path: &Path, sink: &dyn EventSink) -> Result<(), MinifyError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Self::ensure_dir(parent, sink).await,
            _ => Ok(()),
        }
    }

    /// Garantisce che `dir` esista come directory, antenati inclusi.
    ///
    /// Gli antenati passano da `create_dir_all`, che tollera creatori concorrenti;
    /// l'ultimo livello usa `create_dir`, così solo la task che lo crea davvero
    /// emette `DirectoryCreated`.
    pub async fn ensure_dir(dir: &Path, sink: &dyn EventSink) -> Result<(), MinifyError> {
        match tokio::fs::metadata(dir).await {
            Ok(metadata) if metadata.is_dir() => return Ok(()),
            Ok(_) => return Err(Self::not_a_directory(dir)),
            Err(_) => {}
        }

        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MinifyError::filesystem(parent, e))?;
        }

        match tokio::fs::create_dir(dir).await {
            Ok(()) => {
                sink.emit(&BatchEvent::DirectoryCreated {
                    path: dir.to_path_buf(),
                });
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // creata da una task sorella nel frattempo
                match tokio::fs::metadata(dir).await {
                    Ok(metadata) if metadata.is_dir() => Ok(()),
                    _ => Err(Self::not_a_directory(dir)),
                }
            }
            Err(e) => Err(MinifyError::filesystem(dir, e)),
        }
    }

    fn not_a_directory(dir: &Path) -> MinifyError {
        MinifyError::filesystem(
            dir,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventLevel, MemorySink};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_output_path_replaces_prefix_only() {
        let out = PathResolver::get_output_path(
            Path::new("/project/assets/img/icons/logo.png"),
            Path::new("/project/assets"),
            Path::new("/project/public"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/project/public/img/icons/logo.png"));

        // il nome della root sorgente che ricompare nel sotto-path resta invariato
        let out = PathResolver::get_output_path(
            Path::new("/a/assets/assets/x.gif"),
            Path::new("/a/assets"),
            Path::new("/b"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/b/assets/x.gif"));
    }

    #[test]
    fn test_output_path_outside_source_fails() {
        let err = PathResolver::get_output_path(
            Path::new("/elsewhere/a.png"),
            Path::new("/project/assets"),
            Path::new("/project/public"),
        )
        .unwrap_err();
        assert!(matches!(err, MinifyError::Filesystem { .. }));
    }

    #[test]
    fn test_resolve_mirrors_tree() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dist = temp_dir.path().join("dist");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("a.png"), b"x").unwrap();
        std::fs::write(src.join("nested/b.jpg"), b"x").unwrap();
        std::fs::write(src.join("nested/c.txt"), b"x").unwrap();

        let sink = MemorySink::new();
        let items = PathResolver::resolve(&src, &dist, &exts(&["png", "jpg"]), &sink).unwrap();

        assert_eq!(items.len(), 2);
        for item in &items {
            let rel = item.source.strip_prefix(&src).unwrap();
            assert_eq!(item.destination, dist.join(rel));
            assert_ne!(item.source.extension().unwrap(), "txt");
        }
        assert_eq!(sink.count(EventLevel::Debug), 1);
    }

    #[test]
    fn test_resolve_empty_tree_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let items = PathResolver::resolve(
            temp_dir.path(),
            &temp_dir.path().join("out"),
            &exts(&["png"]),
            &sink,
        )
        .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a/b/c");
        let sink = MemorySink::new();

        PathResolver::ensure_dir(&target, &sink).await.unwrap();
        PathResolver::ensure_dir(&target, &sink).await.unwrap();

        assert!(target.is_dir());
        // l'evento di creazione viene emesso solo la prima volta
        assert_eq!(sink.count(EventLevel::Debug), 1);
    }

    #[tokio::test]
    async fn test_ensure_dir_rejects_file_component() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let sink = MemorySink::new();

        let err = PathResolver::ensure_dir(&blocker, &sink).await.unwrap_err();
        assert!(matches!(err, MinifyError::Filesystem { .. }));

        let err = PathResolver::ensure_dir(&blocker.join("child"), &sink).await.unwrap_err();
        assert!(matches!(err, MinifyError::Filesystem { .. }));

        // nessun "Making folder" per directory mai create
        assert_eq!(sink.count(EventLevel::Debug), 0);
    }

    #[tokio::test]
    async fn test_ensure_dir_concurrent_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let shared = temp_dir.path().join("shared/ancestor");
        let sink = Arc::new(MemorySink::new());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let file = shared.join(format!("img{}.png", i));
                let sink = sink.clone();
                tokio::spawn(async move { PathResolver::ensure_parent_dirs(&file, sink.as_ref()).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(shared.is_dir());
        assert_eq!(sink.count(EventLevel::Debug), 1);
    }
}
