//! Parser configuration.

use serde::{Deserialize, Serialize};

use crate::charset::Charset;

/// Default scratch buffer length (8KB). Also the longest accepted header or
/// field line.
pub const DEFAULT_BUFFER_LEN: usize = 8 * 1024;

/// Default maximum number of ordinary fields.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// Default maximum thumbnail size (10MB).
pub const DEFAULT_MAX_THUMBNAIL_SIZE: usize = 10 * 1024 * 1024;

/// Smallest usable buffer. A boundary line must always fit.
const MIN_BUFFER_LEN: usize = 128;

/// Configuration for [`FormDataParser`](crate::FormDataParser).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Length of the per-session line buffer in bytes.
    buffer_len: usize,
    /// Maximum number of ordinary fields.
    max_fields: usize,
    /// Maximum size of a materialized thumbnail.
    max_thumbnail_size: usize,
    /// Reject bodies that break the part ordering contract.
    strict_ordering: bool,
    /// Charset used when the request does not declare one.
    default_charset: Charset,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            buffer_len: DEFAULT_BUFFER_LEN,
            max_fields: DEFAULT_MAX_FIELDS,
            max_thumbnail_size: DEFAULT_MAX_THUMBNAIL_SIZE,
            strict_ordering: false,
            default_charset: Charset::UTF_8,
        }
    }
}

impl ParserConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the line buffer length. Values below 128 bytes are raised to 128.
    #[must_use]
    pub fn buffer_len(mut self, len: usize) -> Self {
        self.buffer_len = len.max(MIN_BUFFER_LEN);
        self
    }

    /// Set the maximum number of ordinary fields.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }

    /// Set the maximum thumbnail size.
    #[must_use]
    pub fn max_thumbnail_size(mut self, size: usize) -> Self {
        self.max_thumbnail_size = size;
        self
    }

    /// Enable or disable ordering validation.
    ///
    /// When enabled, an ordinary field between the thumbnail and the file is
    /// rejected, and a part following the file makes the file stream fail.
    #[must_use]
    pub fn strict_ordering(mut self, strict: bool) -> Self {
        self.strict_ordering = strict;
        self
    }

    /// Set the charset used when none is given to `parse`.
    #[must_use]
    pub fn default_charset(mut self, charset: Charset) -> Self {
        self.default_charset = charset;
        self
    }

    #[must_use]
    pub fn get_buffer_len(&self) -> usize {
        self.buffer_len.max(MIN_BUFFER_LEN)
    }

    #[must_use]
    pub fn get_max_fields(&self) -> usize {
        self.max_fields
    }

    #[must_use]
    pub fn get_max_thumbnail_size(&self) -> usize {
        self.max_thumbnail_size
    }

    #[must_use]
    pub fn is_strict_ordering(&self) -> bool {
        self.strict_ordering
    }

    #[must_use]
    pub fn get_default_charset(&self) -> Charset {
        self.default_charset
    }
}
