//! Core building blocks for filepipe.
//!
//! This crate provides the pieces the ingestion pipeline is assembled from:
//! - [`HashCalculatorManager`] computing N digests in one pass
//! - [`Rewind`] and [`MarkReader`] for explicit mark/reset over any reader
//! - [`InstrumentedStream`], the transparent progress + digest decorator
//! - The shared [`Error`] type and its [`ErrorKind`] classes
//!
//! # Design Principles
//!
//! - Synchronous, blocking I/O; one session per thread
//! - Per-session state is exclusively owned, no internal locking
//! - Byte-for-byte transparency: decorators never alter the data

#![forbid(unsafe_code)]

pub mod error;
pub mod hash;
mod instrumented;
mod progress;
pub mod rewind;

pub use error::{Error, ErrorKind, Result};
pub use hash::{
    DigestCalculator, HashAlgorithm, HashCalculator, HashCalculatorManager, HashInfo,
    UnknownAlgorithm,
};
pub use instrumented::InstrumentedStream;
pub use progress::{NoProgress, ProgressFn, ProgressListener, ProgressRecorder, progress_fn};
pub use rewind::{DEFAULT_READ_AHEAD, MarkReader, Rewind};
