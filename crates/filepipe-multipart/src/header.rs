//! Part headers.

use std::collections::HashMap;

use filepipe_core::{Error, Result};

/// Headers of one part, keyed by lower-cased header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeader {
    headers: HashMap<String, String>,
    name: String,
    filename: Option<String>,
}

impl PartHeader {
    /// Builds the header set from decoded `name: value` lines. Lines without
    /// a colon are ignored.
    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.as_ref().split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let disposition = headers
            .get("content-disposition")
            .ok_or(Error::InvalidFormat {
                detail: "part has no content-disposition header",
            })?;
        let (name, filename) = parse_content_disposition(disposition)?;

        Ok(Self {
            headers,
            name,
            filename,
        })
    }

    /// Field name from `content-disposition`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename from `content-disposition`, if declared. An empty filename
    /// still counts as declared.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    /// Header value by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Parse a Content-Disposition header value.
///
/// Format: `form-data; name="field"; filename="file.txt"`
fn parse_content_disposition(value: &str) -> Result<(String, Option<String>)> {
    let mut name = None;
    let mut filename = None;

    for part in split_params(value) {
        let part = part.trim();
        if let Some((key, raw_value)) = part.split_once('=') {
            let key = key.trim();
            if key.eq_ignore_ascii_case("name") {
                name = Some(unquote(raw_value));
            } else if key.eq_ignore_ascii_case("filename") {
                filename = Some(unquote(raw_value));
            }
        }
    }

    let name = name.ok_or(Error::InvalidFormat {
        detail: "content-disposition has no name parameter",
    })?;
    Ok((name, filename))
}

/// Splits on `;` outside double quotes. Backslashes are not escapes, so
/// Windows paths in filenames survive.
fn split_params(value: &str) -> impl Iterator<Item = &str> {
    let mut in_quotes = false;
    value.split(move |c: char| {
        if c == '"' {
            in_quotes = !in_quotes;
        }
        c == ';' && !in_quotes
    })
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}
