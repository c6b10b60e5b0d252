//! Shared helpers for pipeline integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{self, Read};

use filepipe::{Sink, SinkError, SinkOutcome, UploadDescriptor};

/// In-memory sink keyed by storage key.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub objects: BTreeMap<String, Vec<u8>>,
    pub descriptors: Vec<UploadDescriptor>,
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn save(
        &mut self,
        descriptor: &UploadDescriptor,
        source: &mut dyn Read,
    ) -> Result<SinkOutcome, SinkError> {
        let mut data = Vec::new();
        let bytes_written = io::copy(source, &mut data)?;
        self.objects.insert(descriptor.key.clone(), data);
        self.descriptors.push(descriptor.clone());
        Ok(SinkOutcome {
            location: format!("memory://{}", descriptor.key),
            bytes_written,
        })
    }
}

/// Builds a CRLF form-data body with boundary `XyZ`.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    body: Vec<u8>,
}

pub const BOUNDARY: &str = "XyZ";

pub fn content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.open(&format!("Content-Disposition: form-data; name=\"{name}\""));
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.open(&format!(
            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}"
        ));
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }

    fn open(&mut self, headers: &str) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}\r\n{headers}\r\n\r\n").as_bytes());
    }
}
