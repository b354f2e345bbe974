//! Whole-blob persistence backends for the log store.
//!
//! A backend stores exactly one JSON document. The store reads it, mutates the
//! decoded copy, and writes it back in full on every append.

use std::path::{Path, PathBuf};

use crate::types::LifeLogResult;

/// Load/save pair for a single persisted blob.
pub trait BlobBackend {
    /// Return the stored blob, or `None` when nothing has been saved yet.
    fn load_blob(&self) -> LifeLogResult<Option<String>>;

    /// Replace the stored blob.
    fn save_blob(&mut self, json: &str) -> LifeLogResult<()>;
}

impl<B: BlobBackend + ?Sized> BlobBackend for &mut B {
    fn load_blob(&self) -> LifeLogResult<Option<String>> {
        (**self).load_blob()
    }

    fn save_blob(&mut self, json: &str) -> LifeLogResult<()> {
        (**self).save_blob(json)
    }
}

impl<B: BlobBackend + ?Sized> BlobBackend for Box<B> {
    fn load_blob(&self) -> LifeLogResult<Option<String>> {
        (**self).load_blob()
    }

    fn save_blob(&mut self, json: &str) -> LifeLogResult<()> {
        (**self).save_blob(json)
    }
}

/// In-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    json: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing blob.
    pub fn with_blob(json: impl Into<String>) -> Self {
        Self {
            json: Some(json.into()),
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.json.as_deref()
    }
}

impl BlobBackend for MemoryBackend {
    fn load_blob(&self) -> LifeLogResult<Option<String>> {
        Ok(self.json.clone())
    }

    fn save_blob(&mut self, json: &str) -> LifeLogResult<()> {
        self.json = Some(json.to_string());
        Ok(())
    }
}

/// Durable backend keeping the blob in a single file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Use the file at `path`. Missing parent directories are created on the
    /// first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl BlobBackend for FileBackend {
    fn load_blob(&self) -> LifeLogResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_blob(&mut self, json: &str) -> LifeLogResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tracing::info!("Creating log directory: {}", parent.display());
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        tracing::debug!("Saved log blob: {} ({} bytes)", self.path.display(), json.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_starts_empty() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.load_blob().unwrap(), None);
    }

    #[test]
    fn test_memory_last_write_wins() {
        let mut backend = MemoryBackend::new();
        backend.save_blob("{\"a\":[]}").unwrap();
        backend.save_blob("{}").unwrap();
        assert_eq!(backend.load_blob().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("absent.json"));
        assert_eq!(backend.load_blob().unwrap(), None);
        assert!(!backend.exists());
    }

    #[test]
    fn test_file_roundtrip_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("lifelog.json");
        let mut backend = FileBackend::new(&path);
        backend.save_blob("{}").unwrap();

        let reopened = FileBackend::new(&path);
        assert_eq!(reopened.load_blob().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_borrowed_backend() {
        fn save_through<B: BlobBackend>(mut backend: B) {
            backend.save_blob("{}").unwrap();
        }

        let mut backend = MemoryBackend::new();
        save_through(&mut backend);
        assert_eq!(backend.blob(), Some("{}"));
    }
}
