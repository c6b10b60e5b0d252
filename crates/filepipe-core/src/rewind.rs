//! Explicit mark/rewind over blocking readers.
//!
//! `std::io::Read` has no notion of rewinding, so the capability is modelled
//! as the [`Rewind`] trait and provided for arbitrary readers by
//! [`MarkReader`], which retains the marked region in its own buffer.

use std::io::{self, BufRead, Read};

/// Default read-ahead size of [`MarkReader`].
pub const DEFAULT_READ_AHEAD: usize = 8 * 1024;

/// A reader that can remember a position and return to it.
pub trait Rewind: Read {
    /// Remembers the current position. Up to `read_limit` bytes may be read
    /// before the mark is allowed to lapse.
    fn mark(&mut self, read_limit: usize);

    /// Returns to the most recent mark.
    fn reset(&mut self) -> io::Result<()>;

    /// Whether callers may rely on `mark`/`reset` of this reader.
    fn mark_supported(&self) -> bool {
        true
    }
}

impl<T: Rewind + ?Sized> Rewind for &mut T {
    fn mark(&mut self, read_limit: usize) {
        (**self).mark(read_limit);
    }

    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }

    fn mark_supported(&self) -> bool {
        (**self).mark_supported()
    }
}

impl<T: Rewind + ?Sized> Rewind for Box<T> {
    fn mark(&mut self, read_limit: usize) {
        (**self).mark(read_limit);
    }

    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }

    fn mark_supported(&self) -> bool {
        (**self).mark_supported()
    }
}

#[derive(Debug, Clone, Copy)]
struct MarkState {
    /// Index into the buffer the mark refers to.
    pos: usize,
    limit: usize,
}

/// Buffered reader with [`Rewind`] support.
///
/// Bytes read after `mark` are kept until `read_limit` bytes have been read
/// past the mark; after that the mark lapses and `reset` fails.
#[derive(Debug)]
pub struct MarkReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    read_ahead: usize,
    mark: Option<MarkState>,
}

impl<R: Read> MarkReader<R> {
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self::with_read_ahead(DEFAULT_READ_AHEAD, inner)
    }

    #[must_use]
    pub fn with_read_ahead(read_ahead: usize, inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(read_ahead.max(1)),
            pos: 0,
            read_ahead: read_ahead.max(1),
            mark: None,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Bytes buffered but not yet consumed.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Discards the reader, losing any buffered bytes.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Makes room and reads more bytes from the inner reader. Only called once
    /// every buffered byte has been consumed.
    fn fill(&mut self) -> io::Result<usize> {
        match self.mark {
            Some(mark) if self.pos - mark.pos < mark.limit => {
                self.buf.drain(..mark.pos);
                self.pos -= mark.pos;
                self.mark = Some(MarkState { pos: 0, ..mark });
            }
            _ => {
                self.mark = None;
                self.buf.clear();
                self.pos = 0;
            }
        }

        let start = self.buf.len();
        self.buf.resize(start + self.read_ahead, 0);
        loop {
            match self.inner.read(&mut self.buf[start..]) {
                Ok(n) => {
                    self.buf.truncate(start + n);
                    return Ok(n);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(err);
                }
            }
        }
    }
}

impl<R: Read> Read for MarkReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for MarkReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.fill()?;
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}

impl<R: Read> Rewind for MarkReader<R> {
    fn mark(&mut self, read_limit: usize) {
        self.mark = Some(MarkState {
            pos: self.pos,
            limit: read_limit,
        });
    }

    fn reset(&mut self) -> io::Result<()> {
        match self.mark {
            Some(mark) => {
                self.pos = mark.pos;
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "reset without a valid mark",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = self.data.len().min(self.step).min(out.len());
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn reset_replays_marked_region() {
        let mut reader = MarkReader::new(Cursor::new(b"abcdefgh".to_vec()));
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");

        reader.mark(4);
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cd");
        reader.reset().unwrap();

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"cdefgh");
    }

    #[test]
    fn mark_survives_refills_within_limit() {
        let data: Vec<u8> = (0..64u8).collect();
        let mut reader = MarkReader::with_read_ahead(
            4,
            Trickle {
                data: &data,
                step: 3,
            },
        );
        let mut head = [0u8; 5];
        reader.read_exact(&mut head).unwrap();

        reader.mark(16);
        let mut peek = [0u8; 12];
        reader.read_exact(&mut peek).unwrap();
        assert_eq!(peek.to_vec(), (5..17u8).collect::<Vec<_>>());
        reader.reset().unwrap();

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, (5..64u8).collect::<Vec<_>>());
    }

    #[test]
    fn mark_lapses_past_limit() {
        let data = vec![7u8; 64];
        let mut reader = MarkReader::with_read_ahead(4, Cursor::new(data));
        reader.mark(4);
        let mut buf = [0u8; 12];
        reader.read_exact(&mut buf).unwrap();
        let err = reader.reset().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn reset_without_mark_fails() {
        let mut reader = MarkReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.reset().is_err());
        assert!(reader.mark_supported());
    }

    #[test]
    fn mark_can_be_reused() {
        let mut reader = MarkReader::new(Cursor::new(b"xyz".to_vec()));
        reader.mark(3);
        for _ in 0..3 {
            let mut buf = [0u8; 3];
            reader.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"xyz");
            reader.reset().unwrap();
        }
    }
}
