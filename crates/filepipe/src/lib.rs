//! Streaming upload ingestion.
//!
//! filepipe turns a raw `multipart/form-data` request body into a stored
//! object in one pass over the bytes:
//!
//! - **Parsing**: fields and an optional thumbnail are collected, the file
//!   part is streamed ([`filepipe_multipart`])
//! - **Instrumentation**: progress callbacks and any number of digests are
//!   computed over the same read ([`filepipe_core`])
//! - **Storage**: bytes flow into a [`Sink`] without being buffered
//!
//! # Quick Start
//!
//! ```ignore
//! use filepipe::prelude::*;
//!
//! let pipeline = UploadPipeline::new(
//!     PipelineConfig::new().hash_algorithms([HashAlgorithm::Md5, HashAlgorithm::Sha256]),
//! );
//! let mut sink = FileSystemSink::new("/var/lib/uploads")?;
//! let request = UploadRequest::new(content_type, body, "avatars/42.png")
//!     .content_length(len);
//!
//! match pipeline.ingest(request, &mut sink, progress_fn(|done, total| {
//!     tracing::trace!(done, ?total, "upload progress");
//! })) {
//!     Ok(record) => store_record(&record),
//!     Err(err) => respond(err.status_code(), err.diagnostic("local", None)),
//! }
//! ```
//!
//! # Crate Structure
//!
//! - [`filepipe_core`]: error model, digests, mark/reset, `InstrumentedStream`
//! - [`filepipe_multipart`]: boundary handling and the form-data parser

#![forbid(unsafe_code)]

mod config;
mod error;
mod pipeline;
mod sink;

// Re-export crates
pub use filepipe_core as core;
pub use filepipe_multipart as multipart;

pub use config::{DEFAULT_PLATFORM, PipelineConfig};
pub use error::{UploadError, UploadResult};
pub use pipeline::{TransferReport, UploadPipeline, UploadRecord, UploadRequest, restream};
pub use sink::{FileSystemSink, Sink, SinkError, SinkOutcome, SinkResult, UploadDescriptor};

// Re-export commonly used types
pub use filepipe_core::{
    Error, ErrorKind, HashAlgorithm, HashCalculator, HashCalculatorManager, HashInfo,
    InstrumentedStream, MarkReader, NoProgress, ProgressListener, ProgressRecorder, Rewind,
    progress_fn,
};
pub use filepipe_multipart::{
    Charset, FilePayload, FormDataParser, FormFields, ParsedForm, ParserConfig, PartStream,
    Thumbnail,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Charset, Error, ErrorKind, FileSystemSink, FormDataParser, HashAlgorithm,
        HashCalculatorManager, HashInfo, InstrumentedStream, ParserConfig, PipelineConfig,
        ProgressListener, Sink, UploadDescriptor, UploadError, UploadPipeline, UploadRecord,
        UploadRequest, progress_fn,
    };
}
