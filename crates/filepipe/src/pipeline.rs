//! Upload orchestration: parse, instrument, store.

use std::io::{self, Read};

use filepipe_core::{HashCalculatorManager, HashInfo, InstrumentedStream, ProgressListener};
use filepipe_multipart::{FormDataParser, FormFields, Thumbnail};
use serde::Serialize;
use tracing::instrument;

use crate::config::PipelineConfig;
use crate::error::{UploadError, UploadResult};
use crate::sink::{Sink, SinkError, SinkOutcome, UploadDescriptor};

/// An incoming upload request.
#[derive(Debug)]
pub struct UploadRequest<R> {
    /// Value of the request's `Content-Type` header.
    pub content_type: String,
    pub body: R,
    /// Request charset, if the client declared one.
    pub charset: Option<String>,
    /// Declared body length, used to infer the file size.
    pub content_length: Option<u64>,
    /// Storage key for the file.
    pub key: String,
}

impl<R: Read> UploadRequest<R> {
    pub fn new(content_type: impl Into<String>, body: R, key: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            body,
            charset: None,
            content_length: None,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }
}

/// What one transfer through the decorator produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub outcome: SinkOutcome,
    /// Bytes delivered to the sink.
    pub bytes: u64,
    pub hash_info: HashInfo,
}

/// Result of a completed upload, ready to persist as the file record.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRecord {
    pub key: String,
    pub filename: String,
    pub content_type: String,
    /// Bytes actually streamed to the sink.
    pub size: u64,
    /// Size declared by `_fileSize` or inferred from the content length.
    pub declared_size: Option<u64>,
    pub fields: FormFields,
    #[serde(skip)]
    pub thumbnail: Option<Thumbnail>,
    pub hash_info: HashInfo,
    pub outcome: SinkOutcome,
}

/// Drives uploads from request body to sink.
#[derive(Debug, Clone, Default)]
pub struct UploadPipeline {
    config: PipelineConfig,
    parser: FormDataParser,
}

impl UploadPipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let parser = FormDataParser::new(config.get_parser().clone());
        Self { config, parser }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parses the request, streams the file part into `sink` and returns
    /// the file record.
    ///
    /// Progress is reported to `listener` against the inferred file size.
    /// After the sink returns, any unread payload is an error and the
    /// closing boundary is checked.
    #[instrument(
        skip_all,
        fields(platform = %self.config.get_platform(), sink = sink.name(), key = %request.key)
    )]
    pub fn ingest<R, S, P>(
        &self,
        request: UploadRequest<R>,
        sink: &mut S,
        listener: P,
    ) -> UploadResult<UploadRecord>
    where
        R: Read,
        S: Sink + ?Sized,
        P: ProgressListener,
    {
        let UploadRequest {
            content_type,
            body,
            charset,
            content_length,
            key,
        } = request;

        let form = self
            .parser
            .parse(&content_type, body, charset.as_deref(), content_length)
            .inspect_err(|err| tracing::warn!(error = %err, "rejecting upload request"))?;
        let (fields, thumbnail, file) = form.into_parts();

        let descriptor = UploadDescriptor {
            key,
            filename: file.filename().to_string(),
            content_type: file.content_type().to_string(),
            size: file.size(),
        };
        let stream = InstrumentedStream::new(file.into_stream())
            .with_total(descriptor.size)
            .with_progress(listener)
            .with_hashes(self.config.hash_manager());

        let report = transfer(&descriptor, stream, sink).inspect_err(|err| {
            tracing::warn!(
                error = %err,
                filename = %descriptor.filename,
                "upload failed"
            );
        })?;

        if descriptor.size.is_some_and(|expected| expected != report.bytes) {
            tracing::debug!(
                expected = descriptor.size,
                actual = report.bytes,
                "payload size differs from declared size"
            );
        }
        tracing::info!(
            filename = %descriptor.filename,
            bytes = report.bytes,
            location = %report.outcome.location,
            "upload stored"
        );

        Ok(UploadRecord {
            key: descriptor.key,
            filename: descriptor.filename,
            content_type: descriptor.content_type,
            size: report.bytes,
            declared_size: descriptor.size,
            fields,
            thumbnail,
            hash_info: report.hash_info,
            outcome: report.outcome,
        })
    }
}

/// Streams an existing object into `sink` through the same progress and
/// digest decorator used for uploads. Used for copy and move.
#[instrument(skip_all, fields(sink = sink.name(), key = %descriptor.key))]
pub fn restream<R, S, P>(
    source: R,
    descriptor: &UploadDescriptor,
    sink: &mut S,
    listener: P,
    total: Option<u64>,
    hashes: HashCalculatorManager,
) -> UploadResult<TransferReport>
where
    R: Read,
    S: Sink + ?Sized,
    P: ProgressListener,
{
    let stream = InstrumentedStream::new(source)
        .with_total(total)
        .with_progress(listener)
        .with_hashes(hashes);
    transfer(descriptor, stream, sink)
}

fn transfer<R, P, S>(
    descriptor: &UploadDescriptor,
    stream: InstrumentedStream<R, P>,
    sink: &mut S,
) -> UploadResult<TransferReport>
where
    R: Read,
    P: ProgressListener,
    S: Sink + ?Sized,
{
    let mut source = Tracked::new(stream);
    let outcome = match sink.save(descriptor, &mut source) {
        Ok(outcome) => outcome,
        Err(SinkError::Io(err)) if source.failed => {
            return Err(UploadError::Request(err.into()));
        }
        Err(err) => return Err(err.into()),
    };

    let finished = drain_remainder(&mut source)
        .and_then(|()| source.inner.take_hash_info().map_err(UploadError::from));
    match finished {
        Ok(hash_info) => Ok(TransferReport {
            outcome,
            bytes: source.inner.progressed(),
            hash_info,
        }),
        Err(err) => Err(UploadError::Stored {
            outcome,
            source: Box::new(err),
        }),
    }
}

/// Reads what the sink left behind. Anything left is an error.
fn drain_remainder<R: Read>(source: &mut R) -> UploadResult<()> {
    let unread =
        io::copy(source, &mut io::sink()).map_err(|err| UploadError::Request(err.into()))?;
    if unread > 0 {
        return Err(SinkError::Rejected(format!(
            "sink stopped {unread} bytes before the end of the payload"
        ))
        .into());
    }
    Ok(())
}

/// Remembers whether the source, rather than the sink, failed.
struct Tracked<R> {
    inner: R,
    failed: bool,
}

impl<R> Tracked<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            failed: false,
        }
    }
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|_| self.failed = true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filepipe_core::{HashAlgorithm, ProgressRecorder};
    use std::io::Cursor;

    /// Keeps everything it is given in memory.
    #[derive(Default)]
    struct VecSink {
        data: Vec<u8>,
    }

    impl Sink for VecSink {
        fn name(&self) -> &str {
            "memory"
        }

        fn save(
            &mut self,
            descriptor: &UploadDescriptor,
            source: &mut dyn Read,
        ) -> Result<SinkOutcome, SinkError> {
            let bytes_written = io::copy(source, &mut self.data)?;
            Ok(SinkOutcome {
                location: format!("memory://{}", descriptor.key),
                bytes_written,
            })
        }
    }

    /// Reads only the first byte and declares success.
    struct LazySink;

    impl Sink for LazySink {
        fn name(&self) -> &str {
            "lazy"
        }

        fn save(
            &mut self,
            descriptor: &UploadDescriptor,
            source: &mut dyn Read,
        ) -> Result<SinkOutcome, SinkError> {
            let mut one = [0u8; 1];
            let n = source.read(&mut one)?;
            Ok(SinkOutcome {
                location: format!("lazy://{}", descriptor.key),
                bytes_written: n as u64,
            })
        }
    }

    fn descriptor() -> UploadDescriptor {
        UploadDescriptor {
            key: "copy.bin".into(),
            filename: "copy.bin".into(),
            content_type: "application/octet-stream".into(),
            size: Some(11),
        }
    }

    #[test]
    fn restream_hashes_and_reports() {
        let mut sink = VecSink::default();
        let mut recorder = ProgressRecorder::new();
        let report = restream(
            Cursor::new(b"hello world".to_vec()),
            &descriptor(),
            &mut sink,
            &mut recorder,
            Some(11),
            HashCalculatorManager::new().with_algorithm(HashAlgorithm::Md5),
        )
        .unwrap();

        assert_eq!(sink.data, b"hello world");
        assert_eq!(report.bytes, 11);
        assert_eq!(report.outcome.location, "memory://copy.bin");
        assert_eq!(
            report.hash_info.md5(),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        assert_eq!(recorder.starts, 1);
        assert_eq!(recorder.finishes, 1);
        assert_eq!(recorder.updates.last(), Some(&(11, Some(11))));
    }

    #[test]
    fn sink_that_stops_early_is_an_error() {
        let err = restream(
            Cursor::new(b"hello world".to_vec()),
            &descriptor(),
            &mut LazySink,
            filepipe_core::NoProgress,
            None,
            HashCalculatorManager::new(),
        )
        .unwrap_err();
        assert_eq!(err.stored_location(), Some("lazy://copy.bin"));
        assert!(matches!(
            err,
            UploadError::Stored { ref source, .. }
                if matches!(**source, UploadError::Sink(SinkError::Rejected(_)))
        ));
        assert_eq!(err.status_code(), 500);
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionAborted, "gone"))
        }
    }

    #[test]
    fn source_failure_is_a_request_error() {
        let err = restream(
            Broken,
            &descriptor(),
            &mut VecSink::default(),
            filepipe_core::NoProgress,
            None,
            HashCalculatorManager::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(filepipe_core::ErrorKind::TransportFailure));
        assert_eq!(err.status_code(), 500);
    }
}
