//! Parsed form data: ordinary fields, the optional thumbnail and the file.

use std::io::{self, Read};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::header::PartHeader;
use crate::part::PartStream;

/// Content type reported for a file part that declares none.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Ordinary fields in arrival order. A name may carry several values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    entries: Vec<(String, Vec<String>)>,
    values: usize,
}

impl FormFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping the position of the name's first occurrence.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.values += 1;
        if let Some((_, values)) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            values.push(value);
        } else {
            self.entries.push((name, vec![value]));
        }
    }

    /// First value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values of a field, in arrival order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map_or(&[], |(_, values)| values.as_slice())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of values across all names.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serializes as an object mapping each name to its list of values.
impl Serialize for FormFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, values) in &self.entries {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

/// A thumbnail part, materialized in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    field_name: String,
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl Thumbnail {
    pub(crate) fn new(header: &PartHeader, data: Vec<u8>) -> Self {
        Self {
            field_name: header.name().to_string(),
            filename: header.filename().unwrap_or_default().to_string(),
            content_type: header.content_type().map(str::to_string),
            data,
        }
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// The file part: its metadata and the stream over its payload.
///
/// The payload is not buffered; reading it consumes the request body.
#[derive(Debug)]
pub struct FilePayload<R> {
    header: PartHeader,
    size: Option<u64>,
    offset: u64,
    stream: PartStream<R>,
}

impl<R: Read> FilePayload<R> {
    pub(crate) fn new(header: PartHeader, size: Option<u64>, offset: u64, stream: PartStream<R>) -> Self {
        Self {
            header,
            size,
            offset,
            stream,
        }
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        self.header.name()
    }

    /// Filename as declared by the client. It is not sanitized.
    #[must_use]
    pub fn filename(&self) -> &str {
        self.header.filename().unwrap_or_default()
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header
            .content_type()
            .unwrap_or(DEFAULT_FILE_CONTENT_TYPE)
    }

    #[must_use]
    pub fn header(&self) -> &PartHeader {
        &self.header
    }

    /// Payload size, from the `_fileSize` field or inferred from the
    /// request's content length. `None` when neither is available.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Bytes of the body that preceded the payload.
    #[must_use]
    pub fn bytes_consumed_before_payload(&self) -> u64 {
        self.offset
    }

    pub fn stream_mut(&mut self) -> &mut PartStream<R> {
        &mut self.stream
    }

    #[must_use]
    pub fn into_stream(self) -> PartStream<R> {
        self.stream
    }
}

impl<R: Read> Read for FilePayload<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

/// Result of parsing a request body.
#[derive(Debug)]
pub struct ParsedForm<R> {
    fields: FormFields,
    thumbnail: Option<Thumbnail>,
    file: FilePayload<R>,
}

impl<R: Read> ParsedForm<R> {
    pub(crate) fn new(fields: FormFields, thumbnail: Option<Thumbnail>, file: FilePayload<R>) -> Self {
        Self {
            fields,
            thumbnail,
            file,
        }
    }

    /// First value of an ordinary field.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn get_field_values(&self, name: &str) -> &[String] {
        self.fields.get_all(name)
    }

    #[must_use]
    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    #[must_use]
    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_ref()
    }

    #[must_use]
    pub fn file(&self) -> &FilePayload<R> {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut FilePayload<R> {
        &mut self.file
    }

    #[must_use]
    pub fn into_file(self) -> FilePayload<R> {
        self.file
    }

    #[must_use]
    pub fn into_parts(self) -> (FormFields, Option<Thumbnail>, FilePayload<R>) {
        (self.fields, self.thumbnail, self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_arrival_order() {
        let mut fields = FormFields::new();
        fields.append("b", "1");
        fields.append("a", "2");
        fields.append("b", "3");
        assert_eq!(fields.names().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(fields.get("b"), Some("1"));
        assert_eq!(fields.get_all("b"), ["1", "3"]);
        assert!(fields.get_all("missing").is_empty());
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.value_count(), 3);
    }

    #[test]
    fn fields_serialize_as_object() {
        let mut fields = FormFields::new();
        fields.append("tag", "x");
        fields.append("tag", "y");
        fields.append("title", "t");
        assert_eq!(
            serde_json::to_string(&fields).unwrap(),
            r#"{"tag":["x","y"],"title":["t"]}"#
        );
    }
}
