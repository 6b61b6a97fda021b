//! `multipart/form-data` framing.
//!
//! Each part is one segment:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{name}"[; filename="{file}"]\r\n
//! [Content-Type: {type}\r\n]
//! \r\n
//! {payload}\r\n
//! ```
//!
//! followed by a closing `--{boundary}--\r\n`. The total length is computed
//! before anything is sent.

use std::fmt;

use bytes::Bytes;
use rand::Rng;
use tracing::debug;

use super::writer::{Payload, Segment};
use super::{Form, FormPart, PreparedBody, guess_content_type};
use crate::error::TransferError;

/// Multipart boundary token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Boundary(String);

impl Boundary {
    pub(crate) fn random() -> Self {
        let mut rng = rand::thread_rng();
        let token: String = (0..24)
            .map(|_| format!("{:x}", rng.gen_range(0..16u8)))
            .collect();
        Self(format!("------------------------{token}"))
    }

    #[cfg(test)]
    pub(crate) fn fixed(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn part_header(boundary: &Boundary, part: &FormPart) -> Bytes {
    let mut header = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"",
        quote(part.name())
    );
    if let FormPart::File {
        path, content_type, ..
    } = part
    {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = content_type
            .as_deref()
            .unwrap_or_else(|| guess_content_type(path));
        header.push_str(&format!(
            "; filename=\"{}\"\r\nContent-Type: {content_type}",
            quote(&filename)
        ));
    }
    header.push_str("\r\n\r\n");
    Bytes::from(header)
}

pub(super) async fn prepare(form: &Form, boundary: &Boundary) -> Result<PreparedBody, TransferError> {
    let mut segments = Vec::with_capacity(form.len() + 1);
    let mut total: u64 = 0;

    for part in form.parts() {
        let payload = match part {
            FormPart::Data { value, .. } => Payload::memory(value.clone()),
            FormPart::File { path, .. } => Payload::open_file(path).await?,
        };
        let segment = Segment::new(part_header(boundary, part), payload, Bytes::from_static(b"\r\n"));
        let len = segment.len().ok_or_else(|| {
            let path = match part {
                FormPart::File { path, .. } => path.clone(),
                FormPart::Data { .. } => std::path::PathBuf::new(),
            };
            TransferError::read_file(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "form attachments must be regular files",
                ),
            )
        })?;
        total += len;
        segments.push(segment);
    }

    let closing = Bytes::from(format!("--{boundary}--\r\n"));
    total += closing.len() as u64;
    segments.push(Segment::new(Bytes::new(), Payload::memory(closing), Bytes::new()));

    debug!(parts = form.len(), length = total, "multipart body prepared");
    Ok(PreparedBody {
        segments,
        content_length: Some(total),
        content_type: Some(format!("multipart/form-data; boundary={boundary}")),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_multipart_framing_and_exact_length() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"file contents").unwrap();
        let filename = file
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();

        let form = Form::new()
            .text("title", "hello")
            .file("upload", file.path(), None);
        let body = prepare(&form, &Boundary::fixed("XYZ")).await.unwrap();

        assert_eq!(
            body.content_type(),
            Some("multipart/form-data; boundary=XYZ")
        );
        let declared = body.content_length().unwrap();
        let bytes = body.collect().await.unwrap();
        assert_eq!(declared, bytes.len() as u64);

        let expected = format!(
            "--XYZ\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nhello\r\n\
             --XYZ\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"{filename}\"\r\n\
             Content-Type: text/plain\r\n\r\nfile contents\r\n--XYZ--\r\n"
        );
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_explicit_content_type_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG").unwrap();
        let form = Form::new().file("img", file.path(), Some("image/png".to_string()));
        let body = prepare(&form, &Boundary::fixed("b")).await.unwrap();
        let text = String::from_utf8_lossy(&body.collect().await.unwrap()).into_owned();
        assert!(text.contains("Content-Type: image/png\r\n"));
    }

    #[tokio::test]
    async fn test_missing_attachment_is_read_error() {
        let form = Form::new().file("f", "/no/such/file.bin", None);
        let err = prepare(&form, &Boundary::fixed("b")).await.unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::ReadFileError);
    }

    #[test]
    fn test_random_boundaries_differ() {
        assert_ne!(Boundary::random(), Boundary::random());
    }
}
