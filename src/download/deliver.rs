//! Moves a response body into its sink and checks its length.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use super::DownloadSink;
use crate::error::TransferError;

/// Result of delivering one body.
#[derive(Debug)]
pub(crate) struct Delivery {
    pub received: u64,
    pub partial: bool,
    pub error: Option<TransferError>,
}

impl Delivery {
    /// True when the sink itself failed, leaving no usable response.
    pub(crate) fn sink_failed(&self) -> bool {
        matches!(self.error, Some(TransferError::Write { .. }))
    }
}

/// Drains `body` into `sink`.
///
/// Bytes received before a transport error are kept. When the received count
/// disagrees with `declared`, the delivery is marked partial and the error
/// becomes [`TransferError::PartialFile`].
pub(crate) async fn deliver<S>(mut body: S, declared: Option<u64>, sink: &mut DownloadSink) -> Delivery
where
    S: Stream<Item = Result<Bytes, TransferError>> + Unpin,
{
    let mut received: u64 = 0;
    let mut error = None;

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => {
                if let Err(e) = sink.write_all(&chunk) {
                    warn!(error = %e, "sink rejected response bytes");
                    return Delivery {
                        received,
                        partial: false,
                        error: Some(TransferError::write(e)),
                    };
                }
                received += chunk.len() as u64;
            }
            Err(e) => {
                debug!(received, error = %e, "body stream ended with error");
                error = Some(e);
                break;
            }
        }
    }

    let partial = declared.is_some_and(|expected| expected != received);
    if let (true, Some(expected)) = (partial, declared) {
        warn!(expected, received, "response body length mismatch");
        error = Some(TransferError::PartialFile { expected, received });
    }

    Delivery {
        received,
        partial,
        error,
    }
}

/// Renders a response head: status line, header lines, blank line.
pub(crate) fn render_head(
    version: reqwest::Version,
    status: reqwest::StatusCode,
    headers: &[(String, String)],
) -> Vec<u8> {
    let version = match version {
        reqwest::Version::HTTP_09 => "HTTP/0.9",
        reqwest::Version::HTTP_10 => "HTTP/1.0",
        reqwest::Version::HTTP_2 => "HTTP/2",
        reqwest::Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    };
    let mut head = format!(
        "{version} {} {}\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    for (name, value) in headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head.into_bytes()
}

/// Splits a rendered head into its lines, each keeping its `\r\n`.
pub(crate) fn head_lines(head: &[u8]) -> impl Iterator<Item = &[u8]> {
    head.split_inclusive(|&b| b == b'\n')
}
