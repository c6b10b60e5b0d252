//! Transparent stream decorator that reports progress and computes digests.
//!
//! Every byte delivered downstream is counted once, hashed once, and passed
//! through unchanged. Bytes read inside a mark region are not accounted,
//! because a later reset replays them.

use std::io::{self, Read};

use crate::error::{Error, Result};
use crate::hash::{HashCalculatorManager, HashInfo};
use crate::progress::{NoProgress, ProgressListener};
use crate::rewind::Rewind;

#[derive(Debug)]
enum HashState {
    Off,
    Active(HashCalculatorManager),
    Finalized,
}

/// Byte stream decorator with progress callbacks and one-pass hashing.
///
/// ```ignore
/// let mut stream = InstrumentedStream::new(file)
///     .with_total(Some(len))
///     .with_progress(progress_fn(|done, total| println!("{done}/{total:?}")))
///     .with_hashes(HashCalculatorManager::with_algorithms([HashAlgorithm::Md5]));
/// std::io::copy(&mut stream, &mut sink)?;
/// let digests = stream.take_hash_info()?;
/// ```
///
/// Nested `mark`/`reset` calls are forwarded to the wrapped reader, but the
/// decorator itself reports `mark_supported() == false`: callers that need a
/// peekable view should mark the wrapped reader directly.
#[derive(Debug)]
pub struct InstrumentedStream<R, P = NoProgress> {
    inner: R,
    listener: P,
    total: Option<u64>,
    progressed: u64,
    hashes: HashState,
    started: bool,
    finished: bool,
    mark_depth: usize,
}

impl<R: Read> InstrumentedStream<R, NoProgress> {
    /// Wraps `inner` with no listener, no size hint and no digests.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            listener: NoProgress,
            total: None,
            progressed: 0,
            hashes: HashState::Off,
            started: false,
            finished: false,
            mark_depth: 0,
        }
    }
}

impl<R, P> InstrumentedStream<R, P> {
    /// Replaces the progress listener.
    #[must_use]
    pub fn with_progress<Q: ProgressListener>(self, listener: Q) -> InstrumentedStream<R, Q> {
        InstrumentedStream {
            inner: self.inner,
            listener,
            total: self.total,
            progressed: self.progressed,
            hashes: self.hashes,
            started: self.started,
            finished: self.finished,
            mark_depth: self.mark_depth,
        }
    }

    /// Sets the total size reported with each progress update. `None` for
    /// sources of unknown length.
    #[must_use]
    pub fn with_total(mut self, total: Option<u64>) -> Self {
        self.total = total;
        self
    }

    /// Feeds every delivered byte into `manager`.
    #[must_use]
    pub fn with_hashes(mut self, manager: HashCalculatorManager) -> Self {
        self.hashes = HashState::Active(manager);
        self
    }

    /// Bytes delivered and accounted so far.
    #[must_use]
    pub fn progressed(&self) -> u64 {
        self.progressed
    }

    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Current mark nesting depth. Accounting is suspended while non-zero.
    #[must_use]
    pub fn mark_depth(&self) -> usize {
        self.mark_depth
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn listener(&self) -> &P {
        &self.listener
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Finalizes the digests and returns the snapshot.
    ///
    /// Finalizing is one-way: a second call, or any read afterwards, fails
    /// with [`Error::AccountingMisuse`]. A stream built without digests
    /// returns an empty snapshot and stays readable.
    pub fn take_hash_info(&mut self) -> Result<HashInfo> {
        match std::mem::replace(&mut self.hashes, HashState::Finalized) {
            HashState::Active(manager) => Ok(manager.hash_info()),
            HashState::Off => {
                self.hashes = HashState::Off;
                Ok(HashInfo::default())
            }
            HashState::Finalized => Err(Error::AccountingMisuse {
                detail: "digests already finalized",
            }),
        }
    }
}

impl<R, P: ProgressListener> InstrumentedStream<R, P> {
    fn on_bytes(&mut self, data: &[u8]) {
        if !self.started {
            self.started = true;
            self.listener.start();
        }
        if let HashState::Active(manager) = &mut self.hashes {
            manager.update(data);
        }
        self.progressed += data.len() as u64;
        self.listener.progress(self.progressed, self.total);
    }

    fn on_eof(&mut self) {
        if self.finished {
            return;
        }
        if !self.started {
            self.started = true;
            self.listener.start();
        }
        self.finished = true;
        tracing::trace!(bytes = self.progressed, total = ?self.total, "instrumented stream finished");
        self.listener.finish();
    }
}

impl<R: Read, P: ProgressListener> Read for InstrumentedStream<R, P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if matches!(self.hashes, HashState::Finalized) {
            return Err(Error::AccountingMisuse {
                detail: "read after digests were finalized",
            }
            .into_io());
        }

        let n = self.inner.read(buf)?;
        if self.mark_depth > 0 || buf.is_empty() {
            return Ok(n);
        }
        if n == 0 {
            self.on_eof();
        } else {
            self.on_bytes(&buf[..n]);
        }
        Ok(n)
    }
}

impl<R: Rewind, P: ProgressListener> Rewind for InstrumentedStream<R, P> {
    fn mark(&mut self, read_limit: usize) {
        self.mark_depth += 1;
        self.inner.mark(read_limit);
    }

    fn reset(&mut self) -> io::Result<()> {
        if self.mark_depth == 0 {
            return Err(Error::AccountingMisuse {
                detail: "reset without a matching mark",
            }
            .into_io());
        }
        self.inner.reset()?;
        self.mark_depth -= 1;
        Ok(())
    }

    fn mark_supported(&self) -> bool {
        false
    }
}
