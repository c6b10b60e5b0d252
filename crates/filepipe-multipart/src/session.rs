//! Per-request parse state: the raw reader, the scratch line buffer, the byte
//! count and the boundary. A session is exclusively owned by one parse and
//! is never shared.

use std::io::{BufRead, Read};

use filepipe_core::{Error, MarkReader, Result, Rewind};

use crate::boundary::{Boundary, Delimiter};
use crate::charset::Charset;
use crate::header::PartHeader;

#[derive(Debug)]
pub(crate) struct Session<R> {
    reader: MarkReader<R>,
    line: Vec<u8>,
    peek: Vec<u8>,
    buffer_len: usize,
    consumed: u64,
    boundary: Boundary,
}

impl<R: Read> Session<R> {
    /// Reads up to the first non-blank line and derives the boundary from it.
    pub(crate) fn start(body: R, token: &str, charset: Charset, buffer_len: usize) -> Result<Self> {
        let mut reader = MarkReader::with_read_ahead(buffer_len, body);
        let mut line = Vec::with_capacity(buffer_len);
        let mut consumed = 0u64;

        loop {
            let n = read_complete_line(&mut reader, &mut line, buffer_len)?;
            if n == 0 {
                return Err(Error::NoFilePart);
            }
            consumed += n as u64;
            if line.as_slice() != b"\r\n" && line.as_slice() != b"\n" {
                break;
            }
        }

        let boundary = Boundary::derive(&line, token, charset)?;
        let at_end = !line.ends_with(b"\n");
        if boundary.classify(&line, at_end) == Some(Delimiter::Terminal) {
            return Err(Error::NoFilePart);
        }
        tracing::trace!(
            token,
            line_ending = ?boundary.line_ending(),
            consumed,
            "multipart boundary derived"
        );

        Ok(Self {
            reader,
            line,
            peek: Vec::with_capacity(boundary.terminal_line().len()),
            buffer_len,
            consumed,
            boundary,
        })
    }

    pub(crate) fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Bytes of the body consumed so far. Lookahead is not counted.
    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }

    /// The physical line most recently read.
    pub(crate) fn line(&self) -> &[u8] {
        &self.line
    }

    /// Reads the next physical line, or a buffer-sized piece of a longer one.
    pub(crate) fn read_line(&mut self) -> Result<usize> {
        let n = read_physical_line(&mut self.reader, &mut self.line, self.buffer_len)?;
        self.consumed += n as u64;
        Ok(n)
    }

    /// Reads the next physical line, failing if it does not fit the buffer.
    pub(crate) fn read_complete_line(&mut self) -> Result<usize> {
        let n = read_complete_line(&mut self.reader, &mut self.line, self.buffer_len)?;
        self.consumed += n as u64;
        Ok(n)
    }

    /// Whether the body has no bytes left to read.
    pub(crate) fn at_end(&mut self) -> Result<bool> {
        Ok(self.reader.fill_buf()?.is_empty())
    }

    /// Tests whether the next line is a delimiter without consuming it.
    pub(crate) fn peek_delimiter(&mut self) -> Result<Option<Delimiter>> {
        let limit = self.boundary.terminal_line().len();
        self.reader.mark(limit + 1);
        let peeked = self.peek_line(limit);
        self.reader.reset()?;
        let at_end = peeked?;
        Ok(self.boundary.classify(&self.peek, at_end))
    }

    /// Reads into the peek buffer and reports whether the body ends right
    /// after the piece read.
    fn peek_line(&mut self, limit: usize) -> std::io::Result<bool> {
        read_physical_line(&mut self.reader, &mut self.peek, limit)?;
        if self.peek.ends_with(b"\n") {
            return Ok(false);
        }
        Ok(self.reader.fill_buf()?.is_empty())
    }

    /// Reads header lines up to the blank separator line. `None` if the body
    /// ends first.
    pub(crate) fn read_part_header(&mut self, charset: Charset) -> Result<Option<PartHeader>> {
        let mut lines = Vec::new();
        loop {
            if self.read_complete_line()? == 0 || !self.line.ends_with(b"\n") {
                return Ok(None);
            }
            let text = charset.decode(&self.line);
            let text = text.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                break;
            }
            lines.push(text.to_string());
        }
        PartHeader::from_lines(lines).map(Some)
    }
}

/// Reads up to and including the next `\n`, stopping after `max` bytes.
///
/// A `\r` that would end a truncated piece is left for the next call so a
/// CRLF pair is never split between two pieces.
pub(crate) fn read_physical_line<B: BufRead>(
    reader: &mut B,
    out: &mut Vec<u8>,
    max: usize,
) -> std::io::Result<usize> {
    out.clear();
    while out.len() < max {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        if available.is_empty() {
            break;
        }

        let room = max - out.len();
        let window = &available[..available.len().min(room)];
        if let Some(i) = memchr::memchr(b'\n', window) {
            out.extend_from_slice(&window[..=i]);
            reader.consume(i + 1);
            break;
        }

        let take = window.len();
        if take == room && window[take - 1] == b'\r' && out.len() + take > 1 {
            out.extend_from_slice(&window[..take - 1]);
            reader.consume(take - 1);
            break;
        }
        out.extend_from_slice(window);
        reader.consume(take);
    }
    Ok(out.len())
}

/// Like [`read_physical_line`], but a line longer than `max` is an error.
fn read_complete_line<B: BufRead>(reader: &mut B, out: &mut Vec<u8>, max: usize) -> Result<usize> {
    let n = read_physical_line(reader, out, max)?;
    if n > 0 && !out.ends_with(b"\n") && !reader.fill_buf()?.is_empty() {
        return Err(Error::BufferOverflow { limit: max });
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pieces(data: &[u8], max: usize) -> Vec<Vec<u8>> {
        let mut reader = MarkReader::with_read_ahead(3, Cursor::new(data.to_vec()));
        let mut out = Vec::new();
        let mut all = Vec::new();
        while read_physical_line(&mut reader, &mut out, max).unwrap() > 0 {
            all.push(out.clone());
        }
        all
    }

    #[test]
    fn splits_on_newlines() {
        assert_eq!(
            pieces(b"ab\r\ncd\nef", 64),
            vec![b"ab\r\n".to_vec(), b"cd\n".to_vec(), b"ef".to_vec()]
        );
    }

    #[test]
    fn long_lines_come_in_pieces() {
        assert_eq!(
            pieces(b"abcdefg\n", 3),
            vec![b"abc".to_vec(), b"def".to_vec(), b"g\n".to_vec()]
        );
    }

    #[test]
    fn crlf_is_not_split_between_pieces() {
        assert_eq!(
            pieces(b"ab\r\ncd", 3),
            vec![b"ab".to_vec(), b"\r\n".to_vec(), b"cd".to_vec()]
        );
    }

    #[test]
    fn complete_line_overflow_is_reported() {
        let mut reader = MarkReader::new(Cursor::new(b"abcdef\r\n".to_vec()));
        let mut out = Vec::new();
        let err = read_complete_line(&mut reader, &mut out, 4).unwrap_err();
        assert!(matches!(err, Error::BufferOverflow { limit: 4 }));
    }

    #[test]
    fn session_skips_blank_lines_before_boundary() {
        let body = b"\r\n\r\n--abc\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n";
        let mut session =
            Session::start(Cursor::new(body.to_vec()), "abc", Charset::UTF_8, 128).unwrap();
        assert_eq!(session.consumed(), 11);
        let header = session.read_part_header(Charset::UTF_8).unwrap().unwrap();
        assert_eq!(header.name(), "a");
        assert_eq!(session.consumed(), body.len() as u64);
    }

    #[test]
    fn peek_does_not_advance() {
        let body = b"--abc\r\n--abc--\r\n";
        let mut session =
            Session::start(Cursor::new(body.to_vec()), "abc", Charset::UTF_8, 128).unwrap();
        assert_eq!(session.peek_delimiter().unwrap(), Some(Delimiter::Terminal));
        assert_eq!(session.consumed(), 7);
        assert_eq!(session.read_line().unwrap(), 9);
        assert_eq!(session.line(), b"--abc--\r\n");
    }

    #[test]
    fn leading_garbage_is_fatal() {
        let err = Session::start(Cursor::new(b"hello\r\n--abc\r\n".to_vec()), "abc", Charset::UTF_8, 128)
            .unwrap_err();
        assert!(matches!(err, Error::MissingBoundary));
    }

    #[test]
    fn empty_body_has_no_file_part() {
        let err = Session::start(Cursor::new(Vec::<u8>::new()), "abc", Charset::UTF_8, 128)
            .unwrap_err();
        assert!(matches!(err, Error::NoFilePart));
    }
}
