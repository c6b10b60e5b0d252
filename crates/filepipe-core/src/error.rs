//! Error types shared by the ingestion pipeline.
//!
//! Every failure belongs to one of three classes (see [`ErrorKind`]):
//! malformed input, transport failure on the underlying stream, or misuse of
//! the accounting state (digests, mark/reset). Nothing is retried internally.

use std::io;

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request body cannot be processed. Rejected without retry.
    MalformedRequest,
    /// I/O failure on the underlying stream (reset, truncation, closed).
    TransportFailure,
    /// A documented precondition on the accounting state was violated.
    AccountingMisuse,
}

/// Errors raised while parsing, streaming or hashing an upload.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or unmatched boundary token.
    #[error("boundary not found")]
    MissingBoundary,
    /// End of input reached without finding a file part.
    #[error("no file part")]
    NoFilePart,
    /// A physical line exceeded the configured buffer.
    #[error("buffer overflow: line exceeds {limit} bytes")]
    BufferOverflow { limit: usize },
    /// Too many ordinary fields.
    #[error("too many fields: {count} exceeds limit of {max}")]
    TooManyFields { count: usize, max: usize },
    /// Thumbnail part larger than the configured limit.
    #[error("thumbnail too large: {size} bytes exceeds limit of {max}")]
    ThumbnailTooLarge { size: usize, max: usize },
    /// Structurally invalid multipart body.
    #[error("invalid multipart format: {detail}")]
    InvalidFormat { detail: &'static str },
    /// Charset name that cannot be decoded.
    #[error("unsupported charset: {name}")]
    UnsupportedCharset { name: String },
    /// I/O failure on the underlying stream.
    #[error("transfer failed: {0}")]
    Transport(io::Error),
    /// Finalized digest state or unbalanced mark/reset.
    #[error("accounting misuse: {detail}")]
    AccountingMisuse { detail: &'static str },
}

impl Error {
    /// Returns the class this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingBoundary
            | Self::NoFilePart
            | Self::BufferOverflow { .. }
            | Self::TooManyFields { .. }
            | Self::ThumbnailTooLarge { .. }
            | Self::InvalidFormat { .. }
            | Self::UnsupportedCharset { .. } => ErrorKind::MalformedRequest,
            Self::Transport(_) => ErrorKind::TransportFailure,
            Self::AccountingMisuse { .. } => ErrorKind::AccountingMisuse,
        }
    }

    /// Returns true if the request should be rejected as a client error.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.kind() == ErrorKind::MalformedRequest
    }

    /// Wraps this error so it can be returned from a `Read` implementation.
    ///
    /// Transport errors are unwrapped back to the original `io::Error`.
    #[must_use]
    pub fn into_io(self) -> io::Error {
        match self {
            Self::Transport(err) => err,
            Self::AccountingMisuse { .. } => io::Error::other(self),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

impl From<io::Error> for Error {
    /// Recovers an [`Error`] previously wrapped by [`Error::into_io`]; any
    /// other I/O error becomes [`Error::Transport`].
    fn from(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            let kind = err.kind();
            match err.into_inner().map(|inner| inner.downcast::<Error>()) {
                Some(Ok(inner)) => return *inner,
                Some(Err(inner)) => return Self::Transport(io::Error::new(kind, inner)),
                None => return Self::Transport(io::Error::from(kind)),
            }
        }
        Self::Transport(err)
    }
}
