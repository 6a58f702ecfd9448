use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{PipelineError, PipelineResult};

/// Storage for uploaded file blobs, addressed by key.
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing blob.
    fn put(&self, key: &str, bytes: &[u8]) -> PipelineResult<()>;

    /// Remove the blob. Missing keys are not an error.
    fn delete(&self, key: &str) -> PipelineResult<()>;

    fn exists(&self, key: &str) -> PipelineResult<bool>;
}

/// In-process blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> PipelineResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    /// Number of stored blobs.
    pub fn len(&self) -> PipelineResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> PipelineResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> PipelineResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| PipelineError::persistence("blob store mutex poisoned"))
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> PipelineResult<()> {
        self.lock()?.insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> PipelineResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> PipelineResult<bool> {
        Ok(self.lock()?.contains_key(key))
    }
}

/// Blob store writing files under a root directory (`<root>/<key>`).
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Filesystem path for a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> PipelineResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Blob only appears under its final key once fully written.
        let tmp = path.with_extension("partial");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> PipelineResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        // Per-dataset directory; only removed once empty.
        if let Some(parent) = path.parent() {
            if parent != self.root {
                let _ = fs::remove_dir(parent);
            }
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> PipelineResult<bool> {
        Ok(self.path_for(key).is_file())
    }
}
