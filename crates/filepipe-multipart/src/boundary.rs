//! Boundary delimiters of a multipart body.
//!
//! The token comes from the `Content-Type` header; the line ending is sniffed
//! from the first boundary line instead of being assumed. All delimiter byte
//! sequences are computed once here and reused for every comparison.

use filepipe_core::{Error, Result};

use crate::charset::Charset;

/// Line terminator used by a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    CrLf,
    Lf,
}

impl LineEnding {
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::CrLf => b"\r\n",
            Self::Lf => b"\n",
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.as_bytes().len()
    }

    /// Sniffs the terminator of `line`, if it has one.
    #[must_use]
    pub fn of(line: &[u8]) -> Option<Self> {
        if line.ends_with(b"\r\n") {
            Some(Self::CrLf)
        } else if line.ends_with(b"\n") {
            Some(Self::Lf)
        } else {
            None
        }
    }
}

/// Which delimiter ended a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Another part follows.
    Boundary,
    /// The closing delimiter; the body is complete.
    Terminal,
}

/// Derived delimiter lines for one body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    token: String,
    line_ending: LineEnding,
    body_line: Vec<u8>,
    terminal_line: Vec<u8>,
    terminal_byte_length: usize,
}

impl Boundary {
    /// Extracts the boundary token from a `Content-Type` value.
    ///
    /// The token runs from `boundary=` to the next `;` or the end of the
    /// header; surrounding quotes are removed.
    pub fn token_from_content_type(content_type: &str) -> Result<String> {
        for param in content_type.split(';').skip(1) {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if key.trim().eq_ignore_ascii_case("boundary") {
                let token = value.trim().trim_matches('"').trim_matches('\'');
                if token.is_empty() {
                    return Err(Error::MissingBoundary);
                }
                return Ok(token.to_string());
            }
        }
        Err(Error::MissingBoundary)
    }

    /// Derives the delimiters from the first boundary line of the body.
    ///
    /// The line is accepted only if it decodes to text containing `token`.
    pub fn derive(line: &[u8], token: &str, charset: Charset) -> Result<Self> {
        if token.is_empty() || !charset.decode(line).contains(token) {
            return Err(Error::MissingBoundary);
        }
        let line_ending = LineEnding::of(line).ok_or(Error::InvalidFormat {
            detail: "boundary line has no line ending",
        })?;
        Ok(Self::with_line_ending(token, line_ending))
    }

    /// Builds the delimiters for a known token and line ending.
    #[must_use]
    pub fn with_line_ending(token: &str, line_ending: LineEnding) -> Self {
        let ending = line_ending.as_bytes();

        let mut body_line = Vec::with_capacity(token.len() + 2 + ending.len());
        body_line.extend_from_slice(b"--");
        body_line.extend_from_slice(token.as_bytes());
        body_line.extend_from_slice(ending);

        let mut terminal_line = Vec::with_capacity(token.len() + 4 + ending.len());
        terminal_line.extend_from_slice(b"--");
        terminal_line.extend_from_slice(token.as_bytes());
        terminal_line.extend_from_slice(b"--");
        terminal_line.extend_from_slice(ending);

        let terminal_byte_length = terminal_line.len() + ending.len();
        Self {
            token: token.to_string(),
            line_ending,
            body_line,
            terminal_line,
            terminal_byte_length,
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// `--token` followed by the line ending.
    #[must_use]
    pub fn body_line(&self) -> &[u8] {
        &self.body_line
    }

    /// `--token--` followed by the line ending.
    #[must_use]
    pub fn terminal_line(&self) -> &[u8] {
        &self.terminal_line
    }

    /// Bytes that follow the file payload in a well-formed body: the line
    /// ending before the closing delimiter plus the closing delimiter line.
    #[must_use]
    pub fn terminal_byte_length(&self) -> usize {
        self.terminal_byte_length
    }

    /// Classifies a physical line by exact byte equality.
    ///
    /// The closing delimiter is also recognized without its line ending, but
    /// only when `at_end` says no byte of the body follows the line.
    #[must_use]
    pub fn classify(&self, line: &[u8], at_end: bool) -> Option<Delimiter> {
        let unterminated = &self.terminal_line[..self.terminal_line.len() - self.line_ending.len()];
        if line == self.body_line.as_slice() {
            Some(Delimiter::Boundary)
        } else if line == self.terminal_line.as_slice() || (at_end && line == unterminated) {
            Some(Delimiter::Terminal)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_from_content_type() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        assert_eq!(
            Boundary::token_from_content_type(ct).unwrap(),
            "----WebKitFormBoundary7MA4YWxkTrZu0gW"
        );
    }

    #[test]
    fn token_stops_at_semicolon_and_unquotes() {
        let ct = r#"multipart/form-data; Boundary="simple-boundary"; charset=utf-8"#;
        assert_eq!(
            Boundary::token_from_content_type(ct).unwrap(),
            "simple-boundary"
        );
    }

    #[test]
    fn missing_token_is_fatal() {
        for ct in ["multipart/form-data", "multipart/form-data; boundary=", "text/plain; a=b"] {
            assert!(matches!(
                Boundary::token_from_content_type(ct),
                Err(Error::MissingBoundary)
            ));
        }
    }

    #[test]
    fn derive_sniffs_crlf() {
        let boundary = Boundary::derive(b"------X\r\n", "----X", Charset::UTF_8).unwrap();
        assert_eq!(boundary.line_ending(), LineEnding::CrLf);
        assert_eq!(boundary.body_line(), b"------X\r\n");
        assert_eq!(boundary.terminal_line(), b"------X--\r\n");
        assert_eq!(boundary.terminal_byte_length(), 13);
    }

    #[test]
    fn derive_sniffs_bare_lf() {
        let boundary = Boundary::derive(b"--abc\n", "abc", Charset::UTF_8).unwrap();
        assert_eq!(boundary.line_ending(), LineEnding::Lf);
        assert_eq!(boundary.terminal_line(), b"--abc--\n");
        assert_eq!(boundary.terminal_byte_length(), 9);
    }

    #[test]
    fn derive_rejects_line_without_token() {
        assert!(matches!(
            Boundary::derive(b"preamble\r\n", "abc", Charset::UTF_8),
            Err(Error::MissingBoundary)
        ));
    }

    #[test]
    fn classify_uses_exact_lines() {
        let boundary = Boundary::with_line_ending("abc", LineEnding::CrLf);
        assert_eq!(boundary.classify(b"--abc\r\n", false), Some(Delimiter::Boundary));
        assert_eq!(boundary.classify(b"--abc--\r\n", false), Some(Delimiter::Terminal));
        assert_eq!(boundary.classify(b"--abcd\r\n", false), None);
        assert_eq!(boundary.classify(b"--abc\n", false), None);
        assert_eq!(boundary.classify(b"x--abc\r\n", false), None);
    }

    #[test]
    fn unterminated_closing_delimiter_only_at_end() {
        let boundary = Boundary::with_line_ending("abc", LineEnding::Lf);
        assert_eq!(boundary.classify(b"--abc--", true), Some(Delimiter::Terminal));
        assert_eq!(boundary.classify(b"--abc--", false), None);
        assert_eq!(boundary.classify(b"--abc", true), None);
    }
}
