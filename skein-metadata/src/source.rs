//! Where the metadata log bytes come from.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use skein_common::Result;

/// A readable copy of the metadata log.
pub trait LogSource: Send + Sync + fmt::Debug {
    /// Returns the whole log.
    fn read_all(&self) -> Result<Bytes>;
}

/// Reads the log from a segment file on disk.
#[derive(Debug, Clone)]
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSource for FileLogSource {
    fn read_all(&self) -> Result<Bytes> {
        let data = std::fs::read(&self.path)?;
        tracing::debug!(path = %self.path.display(), bytes = data.len(), "read metadata log");
        Ok(Bytes::from(data))
    }
}

/// Serves a log held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSource {
    data: Bytes,
}

impl MemoryLogSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl LogSource for MemoryLogSource {
    fn read_all(&self) -> Result<Bytes> {
        Ok(self.data.clone())
    }
}
