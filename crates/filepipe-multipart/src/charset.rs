//! Character sets used to decode field values and the boundary line.

use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;
use filepipe_core::Error;
use serde::{Deserialize, Serialize};

/// A request charset, resolved from its label by the WHATWG rules.
///
/// Only ASCII-compatible encodings are accepted: delimiters and header
/// names are matched as ASCII bytes before anything is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Charset(&'static Encoding);

impl Charset {
    pub const UTF_8: Self = Self(encoding_rs::UTF_8);
    /// What the `iso-8859-1`, `latin1` and `us-ascii` labels resolve to.
    pub const WINDOWS_1252: Self = Self(encoding_rs::WINDOWS_1252);

    /// Parses a charset label, ignoring case and surrounding quotes.
    pub fn parse(label: &str) -> Result<Self, Error> {
        let label = label.trim().trim_matches('"');
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) if encoding.is_ascii_compatible() => Ok(Self(encoding)),
            _ => Err(Error::UnsupportedCharset {
                name: label.to_string(),
            }),
        }
    }

    /// Canonical name of the encoding.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    #[must_use]
    pub fn encoding(self) -> &'static Encoding {
        self.0
    }

    /// Decodes `bytes`. Malformed sequences become U+FFFD rather than errors,
    /// and a leading byte order mark is kept as data.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        let (text, _had_errors) = self.0.decode_without_bom_handling(bytes);
        text.into_owned()
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Charset {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Charset> for String {
    fn from(value: Charset) -> Self {
        value.name().to_string()
    }
}
