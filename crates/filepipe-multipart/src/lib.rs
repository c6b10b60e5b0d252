//! Streaming `multipart/form-data` parsing for filepipe.
//!
//! The parser reads the request body once, front to back. Ordinary fields
//! and an optional thumbnail are collected in memory; the first file part
//! is returned as a [`PartStream`] so its payload can flow to storage
//! without being buffered.
//!
//! # Part ordering
//!
//! A body is a sequence of ordinary fields, optionally a thumbnail announced
//! by `_hasTh=true`, and then the file part. Anything after the file part is
//! not parsed. See [`ParserConfig::strict_ordering`] for the validating mode.

#![forbid(unsafe_code)]

mod boundary;
mod charset;
mod config;
mod form;
mod header;
mod parser;
mod part;
mod session;

pub use boundary::{Boundary, Delimiter, LineEnding};
pub use charset::Charset;
pub use config::{
    DEFAULT_BUFFER_LEN, DEFAULT_MAX_FIELDS, DEFAULT_MAX_THUMBNAIL_SIZE, ParserConfig,
};
pub use form::{DEFAULT_FILE_CONTENT_TYPE, FilePayload, FormFields, ParsedForm, Thumbnail};
pub use header::PartHeader;
pub use parser::{FILE_SIZE_FIELD, FormDataParser, HAS_THUMBNAIL_FIELD, parse};
pub use part::PartStream;
