//! Storage seam: where file bytes end up.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Sink operation errors.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("upload rejected: {0}")]
    Rejected(String),
}

/// Result type for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// What a sink is asked to store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadDescriptor {
    pub key: String,
    pub filename: String,
    pub content_type: String,
    /// Expected size, when known up front.
    pub size: Option<u64>,
}

/// What a sink reports after storing an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkOutcome {
    /// Backend-specific location of the stored object.
    pub location: String,
    pub bytes_written: u64,
}

/// A storage backend.
///
/// `save` pulls bytes from `source` until EOF. A source error must be
/// returned as-is (wrapped in [`SinkError::Io`]) and any partial object
/// discarded.
pub trait Sink {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    fn save(&mut self, descriptor: &UploadDescriptor, source: &mut dyn Read)
    -> SinkResult<SinkOutcome>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn save(
        &mut self,
        descriptor: &UploadDescriptor,
        source: &mut dyn Read,
    ) -> SinkResult<SinkOutcome> {
        (**self).save(descriptor, source)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn save(
        &mut self,
        descriptor: &UploadDescriptor,
        source: &mut dyn Read,
    ) -> SinkResult<SinkOutcome> {
        (**self).save(descriptor, source)
    }
}

/// Local filesystem sink storing each key under a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemSink {
    root: PathBuf,
}

impl FileSystemSink {
    /// Create a sink rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> SinkResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path for a key. Keys must be relative and may not leave the root.
    pub fn key_path(&self, key: &str) -> SinkResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
            return Err(SinkError::InvalidKey(format!("not a relative key: {key:?}")));
        }
        for component in Path::new(key).components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(SinkError::InvalidKey(format!(
                    "contains unsafe path component: {key}"
                )));
            }
        }
        Ok(self.root.join(key))
    }

    fn write_temp(temp_path: &Path, source: &mut dyn Read) -> io::Result<u64> {
        let mut file = fs::File::create(temp_path)?;
        let written = io::copy(source, &mut file)?;
        file.flush()?;
        // Data must be on disk before the rename.
        file.sync_all()?;
        Ok(written)
    }
}

impl Sink for FileSystemSink {
    fn name(&self) -> &str {
        "filesystem"
    }

    #[instrument(skip(self, source), fields(backend = "filesystem", key = %descriptor.key))]
    fn save(
        &mut self,
        descriptor: &UploadDescriptor,
        source: &mut dyn Read,
    ) -> SinkResult<SinkOutcome> {
        let path = self.key_path(&descriptor.key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map_or_else(|| temp_name.clone(), |n| format!("{}{temp_name}", n.to_string_lossy())),
        );

        let bytes_written = match Self::write_temp(&temp_path, source) {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&temp_path);
                return Err(err.into());
            }
        };
        if let Err(err) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }

        tracing::debug!(bytes_written, path = %path.display(), "object stored");
        Ok(SinkOutcome {
            location: path.display().to_string(),
            bytes_written,
        })
    }
}
