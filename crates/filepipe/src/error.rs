//! Upload errors as seen by the host.

use filepipe_core::ErrorKind;
use thiserror::Error;

use crate::sink::{SinkError, SinkOutcome};

/// Why an upload failed.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request body could not be parsed or read.
    #[error(transparent)]
    Request(#[from] filepipe_core::Error),

    /// The sink failed to store the payload.
    #[error("storage failed: {0}")]
    Sink(#[from] SinkError),

    /// The sink committed the object, then the upload failed. The object at
    /// `outcome.location` belongs to no record and should be removed.
    #[error("upload failed after storing {}: {source}", .outcome.location)]
    Stored {
        outcome: SinkOutcome,
        source: Box<UploadError>,
    },
}

/// Result type for pipeline operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;

impl UploadError {
    /// Failure class of a request error; `None` for sink failures.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Request(err) => Some(err.kind()),
            Self::Sink(_) => None,
            Self::Stored { source, .. } => source.kind(),
        }
    }

    /// Location of an object the sink already committed before the failure.
    #[must_use]
    pub fn stored_location(&self) -> Option<&str> {
        match self {
            Self::Stored { outcome, .. } => Some(&outcome.location),
            _ => None,
        }
    }

    /// HTTP status a host should answer with: 400 for a malformed request,
    /// 500 for everything else.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        let client_error = match self {
            Self::Request(err) => err.is_malformed(),
            Self::Sink(err) => matches!(err, SinkError::InvalidKey(_)),
            Self::Stored { source, .. } => return source.status_code(),
        };
        if client_error { 400 } else { 500 }
    }

    /// Message for the client. Malformed requests get the parser's reason;
    /// other failures get a generic message naming the platform and file.
    #[must_use]
    pub fn diagnostic(&self, platform: &str, filename: Option<&str>) -> String {
        if let Self::Stored { source, .. } = self {
            return source.diagnostic(platform, filename);
        }
        if self.status_code() == 400 {
            return self.to_string();
        }
        match filename {
            Some(name) => format!("upload of {name:?} to {platform} failed"),
            None => format!("upload to {platform} failed"),
        }
    }
}
