//! Upload engine: request bodies built from a raw buffer, a file or a form.
//!
//! All three strategies produce a [`PreparedBody`], a chain of segments that
//! are pulled through the same writer state machine (see [`writer`]).

mod multipart;
mod writer;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::error::TransferError;

use multipart::Boundary;
use writer::{Payload, Segment};

/// Request body source for one execution.
#[derive(Debug, Clone, Default)]
pub enum UploadSource {
    /// No body.
    #[default]
    None,
    /// Flat, already-encoded fields sent as-is.
    Bytes(Bytes),
    /// File streamed from disk.
    File {
        /// File to read.
        path: PathBuf,
        /// Declared size; the file's own length is used when absent.
        declared_size: Option<u64>,
    },
    /// Multipart form.
    Multipart(Form),
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// Inline value.
    Data {
        /// Field name.
        name: String,
        /// Field value.
        value: Bytes,
    },
    /// File attachment.
    File {
        /// Field name.
        name: String,
        /// File to attach.
        path: PathBuf,
        /// Content type; guessed from the extension when absent.
        content_type: Option<String>,
    },
}

impl FormPart {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Data { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// Ordered list of multipart form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    parts: Vec<FormPart>,
}

impl Form {
    /// Creates an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an inline text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Data {
            name: name.into(),
            value: Bytes::from(value.into()),
        });
        self
    }

    /// Adds an inline binary field.
    #[must_use]
    pub fn bytes(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.parts.push(FormPart::Data {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a file attachment.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        content_type: Option<String>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            path: path.into(),
            content_type,
        });
        self
    }

    /// Builds a form from `name → value` pairs.
    ///
    /// A value of the form `@path` attaches that file; an optional
    /// `;type=mime` suffix sets its content type.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut form = Self::new();
        for (name, value) in fields {
            let value = value.as_ref();
            form = match value.strip_prefix('@') {
                Some(reference) => {
                    let (path, content_type) = match reference.split_once(";type=") {
                        Some((path, mime)) => (path, Some(mime.to_string())),
                        None => (reference, None),
                    };
                    form.file(name, path, content_type)
                }
                None => form.text(name, value),
            };
        }
        form
    }

    /// Parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when the form has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Guesses a content type from a file extension.
#[must_use]
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("txt" | "text" | "log") => "text/plain",
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",
        Some("json") => "application/json",
        Some("js") => "application/javascript",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Content type sent with flat POST fields unless a header overrides it.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A request body ready to be streamed.
#[derive(Debug)]
pub(crate) struct PreparedBody {
    segments: Vec<Segment>,
    content_length: Option<u64>,
    content_type: Option<String>,
}

impl PreparedBody {
    fn empty() -> Self {
        Self {
            segments: Vec::new(),
            content_length: None,
            content_type: None,
        }
    }

    /// Exact body length, when known before sending.
    pub(crate) fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Content type the strategy requires (multipart boundary), if any.
    pub(crate) fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// True when the strategy produced no body at all.
    pub(crate) fn is_none(&self) -> bool {
        self.segments.is_empty() && self.content_length.is_none()
    }

    /// Converts the segment chain into a streaming request body.
    pub(crate) fn into_body(self) -> reqwest::Body {
        reqwest::Body::wrap_stream(writer::stream_segments(self.segments))
    }

    /// Drains every segment into memory.
    #[cfg(test)]
    pub(crate) async fn collect(self) -> Result<Vec<u8>, TransferError> {
        use futures_util::TryStreamExt;

        let chunks: Vec<Bytes> = writer::stream_segments(self.segments)
            .try_collect()
            .await?;
        Ok(chunks.concat())
    }
}

/// Selects and prepares the body for one attempt.
///
/// Files are opened here so that read failures surface as
/// [`TransferError::ReadFile`] before anything is sent.
#[instrument(level = "debug", skip(source))]
pub(crate) async fn prepare(source: &UploadSource) -> Result<PreparedBody, TransferError> {
    match source {
        UploadSource::None => Ok(PreparedBody::empty()),
        UploadSource::Bytes(bytes) => {
            debug!(len = bytes.len(), "raw buffer upload");
            Ok(PreparedBody {
                content_length: Some(bytes.len() as u64),
                segments: vec![Segment::new(
                    Bytes::new(),
                    Payload::memory(bytes.clone()),
                    Bytes::new(),
                )],
                content_type: None,
            })
        }
        UploadSource::File {
            path,
            declared_size,
        } => {
            let payload = Payload::open_file(path).await?;
            let length = payload.len().or(*declared_size);
            debug!(path = %path.display(), ?length, "file stream upload");
            Ok(PreparedBody {
                content_length: length,
                segments: vec![Segment::new(Bytes::new(), payload, Bytes::new())],
                content_type: None,
            })
        }
        UploadSource::Multipart(form) => multipart::prepare(form, &Boundary::random()).await,
    }
}
