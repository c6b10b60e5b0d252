//! Reading one part's bytes up to the next delimiter.

use std::io::{self, Read};

use filepipe_core::{Error, Result};

use crate::boundary::Delimiter;
use crate::session::Session;

/// Position inside one part's payload.
///
/// Bytes are served from the session's line buffer. A line is only a
/// delimiter candidate when it starts a line, and the line ending in front
/// of a delimiter belongs to the delimiter rather than the payload.
#[derive(Debug)]
pub(crate) struct PartCursor {
    start: usize,
    end: usize,
    at_line_start: bool,
    closing: Option<Delimiter>,
    whole_lines: bool,
}

impl PartCursor {
    /// A cursor over a part whose lines may be arbitrarily long.
    pub(crate) fn streaming() -> Self {
        Self {
            start: 0,
            end: 0,
            at_line_start: true,
            closing: None,
            whole_lines: false,
        }
    }

    /// A cursor that rejects lines longer than the session buffer.
    pub(crate) fn bounded() -> Self {
        Self {
            whole_lines: true,
            ..Self::streaming()
        }
    }

    pub(crate) fn closing(&self) -> Option<Delimiter> {
        self.closing
    }

    pub(crate) fn read<R: Read>(&mut self, session: &mut Session<R>, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.start < self.end {
                let n = (self.end - self.start).min(buf.len());
                buf[..n].copy_from_slice(&session.line()[self.start..self.start + n]);
                self.start += n;
                return Ok(n);
            }
            if self.closing.is_some() {
                return Ok(0);
            }
            self.refill(session)?;
        }
    }

    /// Reads the rest of the part into memory.
    ///
    /// With a `limit`, an oversized part is drained to learn its full size
    /// and reported as [`Error::ThumbnailTooLarge`].
    pub(crate) fn read_to_vec<R: Read>(
        &mut self,
        session: &mut Session<R>,
        limit: Option<usize>,
    ) -> Result<Vec<u8>> {
        let max = limit.unwrap_or(usize::MAX);
        let mut data = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = self.read(session, &mut chunk)?;
            if n == 0 {
                return Ok(data);
            }
            if data.len() + n > max {
                let mut size = data.len() + n;
                loop {
                    match self.read(session, &mut chunk)? {
                        0 => return Err(Error::ThumbnailTooLarge { size, max }),
                        n => size += n,
                    }
                }
            }
            data.extend_from_slice(&chunk[..n]);
        }
    }

    fn refill<R: Read>(&mut self, session: &mut Session<R>) -> Result<()> {
        let n = if self.whole_lines {
            session.read_complete_line()?
        } else {
            session.read_line()?
        };
        if n == 0 {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "multipart body ended before the closing boundary",
            )));
        }

        if self.at_line_start {
            let at_end = !session.line().ends_with(b"\n") && session.at_end()?;
            if let Some(delimiter) = session.boundary().classify(session.line(), at_end) {
                tracing::trace!(?delimiter, consumed = session.consumed(), "part delimiter");
                self.closing = Some(delimiter);
                self.start = 0;
                self.end = 0;
                return Ok(());
            }
        }

        let ending = session.boundary().line_ending();
        self.at_line_start = session.line().ends_with(ending.as_bytes());
        let mut end = n;
        if self.at_line_start && session.peek_delimiter()?.is_some() {
            end -= ending.len();
        }
        self.start = 0;
        self.end = end;
        Ok(())
    }
}

/// Readable view of one part's payload.
///
/// The stream ends at the next delimiter, never yielding the delimiter or
/// the line ending in front of it. It borrows nothing: the parse session
/// moves into the stream, and dropping the stream releases the body.
/// Marking is not supported on this stream.
#[derive(Debug)]
pub struct PartStream<R> {
    session: Session<R>,
    cursor: PartCursor,
    strict: bool,
}

impl<R: Read> PartStream<R> {
    pub(crate) fn new(session: Session<R>, strict: bool) -> Self {
        Self {
            session,
            cursor: PartCursor::streaming(),
            strict,
        }
    }

    /// The delimiter that ended the part, once the stream has reached it.
    #[must_use]
    pub fn closing(&self) -> Option<Delimiter> {
        self.cursor.closing()
    }

    /// Bytes of the request body consumed so far, headers included.
    #[must_use]
    pub fn bytes_consumed(&self) -> u64 {
        self.session.consumed()
    }

    fn read_part(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.cursor.read(&mut self.session, buf)?;
        if n == 0
            && !buf.is_empty()
            && self.strict
            && self.cursor.closing() == Some(Delimiter::Boundary)
        {
            return Err(Error::InvalidFormat {
                detail: "file part must be the last part",
            });
        }
        Ok(n)
    }
}

impl<R: Read> Read for PartStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_part(buf).map_err(Error::into_io)
    }
}
