//! Streaming `multipart/form-data` parser.
//!
//! Parts are consumed in order: ordinary fields are decoded into memory, an
//! optional thumbnail is materialized, and parsing stops at the first file
//! part, which is handed back as a stream over the rest of the body.
//!
//! # Example
//!
//! ```ignore
//! let parser = FormDataParser::new(ParserConfig::default());
//! let mut form = parser.parse(content_type, body, None, Some(content_length))?;
//! let title = form.get_field("title").map(str::to_string);
//! std::io::copy(form.file_mut(), &mut destination)?;
//! ```

use std::io::Read;

use filepipe_core::{Error, Result};

use crate::boundary::{Boundary, Delimiter};
use crate::charset::Charset;
use crate::config::ParserConfig;
use crate::form::{FilePayload, FormFields, ParsedForm, Thumbnail};
use crate::header::PartHeader;
use crate::part::{PartCursor, PartStream};
use crate::session::Session;

/// Field announcing that the next file-bearing part is a thumbnail.
pub const HAS_THUMBNAIL_FIELD: &str = "_hasTh";

/// Field carrying the client-declared payload size.
pub const FILE_SIZE_FIELD: &str = "_fileSize";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartKind {
    Field,
    Thumbnail,
    File,
}

fn classify(header: &PartHeader, fields: &FormFields, have_thumbnail: bool) -> PartKind {
    if header.filename().is_none() {
        PartKind::Field
    } else if !have_thumbnail && fields.get(HAS_THUMBNAIL_FIELD) == Some("true") {
        PartKind::Thumbnail
    } else {
        PartKind::File
    }
}

/// Parses form-data bodies according to a [`ParserConfig`].
#[derive(Debug, Clone, Default)]
pub struct FormDataParser {
    config: ParserConfig,
}

impl FormDataParser {
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses `body` up to the first file part.
    ///
    /// `charset` overrides the configured default for field values and the
    /// boundary line. `content_length` is the declared body length and is
    /// only used to infer the file size.
    ///
    /// # Errors
    ///
    /// Fails with a malformed-request error when the boundary is missing,
    /// the body has no file part, or a limit is exceeded, and with a
    /// transport error when reading the body fails.
    pub fn parse<R: Read>(
        &self,
        content_type: &str,
        body: R,
        charset: Option<&str>,
        content_length: Option<u64>,
    ) -> Result<ParsedForm<R>> {
        let token = Boundary::token_from_content_type(content_type)?;
        let charset = match charset {
            Some(label) => Charset::parse(label)?,
            None => self.config.get_default_charset(),
        };
        let strict = self.config.is_strict_ordering();
        let mut session = Session::start(body, &token, charset, self.config.get_buffer_len())?;

        let mut fields = FormFields::new();
        let mut thumbnail: Option<Thumbnail> = None;

        loop {
            let Some(header) = session.read_part_header(charset)? else {
                return Err(Error::NoFilePart);
            };
            let kind = classify(&header, &fields, thumbnail.is_some());
            tracing::trace!(
                name = header.name(),
                filename = header.filename(),
                ?kind,
                "part headers read"
            );

            let closing = match kind {
                PartKind::File => {
                    let size = infer_size(&fields, &session, content_length)?;
                    let offset = session.consumed();
                    tracing::debug!(
                        field = header.name(),
                        filename = header.filename(),
                        size,
                        offset,
                        fields = fields.value_count(),
                        thumbnail = thumbnail.is_some(),
                        "file part reached"
                    );
                    let stream = PartStream::new(session, strict);
                    let file = FilePayload::new(header, size, offset, stream);
                    return Ok(ParsedForm::new(fields, thumbnail, file));
                }
                PartKind::Thumbnail => {
                    let mut cursor = PartCursor::streaming();
                    let data = cursor
                        .read_to_vec(&mut session, Some(self.config.get_max_thumbnail_size()))?;
                    tracing::debug!(name = header.name(), size = data.len(), "thumbnail captured");
                    thumbnail = Some(Thumbnail::new(&header, data));
                    cursor.closing()
                }
                PartKind::Field => {
                    if strict && thumbnail.is_some() {
                        return Err(Error::InvalidFormat {
                            detail: "thumbnail must immediately precede the file part",
                        });
                    }
                    let max = self.config.get_max_fields();
                    if fields.value_count() >= max {
                        return Err(Error::TooManyFields {
                            count: fields.value_count() + 1,
                            max,
                        });
                    }
                    let mut cursor = PartCursor::bounded();
                    let value = charset.decode(&cursor.read_to_vec(&mut session, None)?);
                    tracing::trace!(name = header.name(), len = value.len(), "field read");
                    fields.append(header.name(), value);
                    cursor.closing()
                }
            };

            if closing == Some(Delimiter::Terminal) {
                return Err(Error::NoFilePart);
            }
        }
    }
}

/// Parses with the default configuration.
///
/// # Errors
///
/// See [`FormDataParser::parse`].
pub fn parse<R: Read>(
    content_type: &str,
    body: R,
    charset: Option<&str>,
    content_length: Option<u64>,
) -> Result<ParsedForm<R>> {
    FormDataParser::default().parse(content_type, body, charset, content_length)
}

/// Declared `_fileSize`, else what remains of `content_length` once the
/// headers and the closing delimiter are accounted for.
fn infer_size<R: Read>(
    fields: &FormFields,
    session: &Session<R>,
    content_length: Option<u64>,
) -> Result<Option<u64>> {
    if let Some(declared) = fields.get(FILE_SIZE_FIELD) {
        return declared
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::InvalidFormat {
                detail: "_fileSize is not a decimal integer",
            });
    }
    let trailer = session.boundary().terminal_byte_length() as u64;
    Ok(content_length
        .and_then(|len| len.checked_sub(session.consumed()))
        .and_then(|rest| rest.checked_sub(trailer)))
}
