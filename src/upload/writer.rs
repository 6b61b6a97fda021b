//! Resumable segment writer shared by every upload strategy.
//!
//! A segment is `header → payload → footer`. Each call to
//! [`Segment::next_chunk`] advances the state machine by at most one chunk,
//! so the caller controls pacing and can interleave other work between
//! chunks. File payloads are read in [`UPLOAD_WINDOW`]-sized windows and the
//! handle is dropped as soon as the payload is exhausted.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::Stream;
use tokio::io::AsyncReadExt;

use crate::config::UPLOAD_WINDOW;
use crate::error::TransferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Payload,
    Footer,
    Done,
}

/// Body bytes of a segment.
#[derive(Debug)]
pub(crate) enum Payload {
    Memory(Bytes),
    File {
        path: PathBuf,
        handle: Option<tokio::fs::File>,
        len: Option<u64>,
    },
}

impl Payload {
    pub(crate) fn memory(bytes: Bytes) -> Self {
        Self::Memory(bytes)
    }

    /// Opens `path` for streaming. Non-regular files have no known length.
    pub(crate) async fn open_file(path: &Path) -> Result<Self, TransferError> {
        let handle = tokio::fs::File::open(path)
            .await
            .map_err(|e| TransferError::read_file(path, e))?;
        let metadata = handle
            .metadata()
            .await
            .map_err(|e| TransferError::read_file(path, e))?;
        let len = metadata.is_file().then(|| metadata.len());
        Ok(Self::File {
            path: path.to_path_buf(),
            handle: Some(handle),
            len,
        })
    }

    pub(crate) fn len(&self) -> Option<u64> {
        match self {
            Self::Memory(bytes) => Some(bytes.len() as u64),
            Self::File { len, .. } => *len,
        }
    }
}

/// One `header → payload → footer` unit of a request body.
#[derive(Debug)]
pub(crate) struct Segment {
    header: Bytes,
    payload: Payload,
    footer: Bytes,
    stage: Stage,
}

impl Segment {
    pub(crate) fn new(header: Bytes, payload: Payload, footer: Bytes) -> Self {
        Self {
            header,
            payload,
            footer,
            stage: Stage::Header,
        }
    }

    /// Framing plus payload length, when the payload length is known.
    pub(crate) fn len(&self) -> Option<u64> {
        self.payload
            .len()
            .map(|n| n + self.header.len() as u64 + self.footer.len() as u64)
    }

    /// Produces the next chunk, or `None` once the footer has been emitted.
    pub(crate) async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransferError> {
        loop {
            match self.stage {
                Stage::Header => {
                    self.stage = Stage::Payload;
                    if !self.header.is_empty() {
                        return Ok(Some(std::mem::take(&mut self.header)));
                    }
                }
                Stage::Payload => match &mut self.payload {
                    Payload::Memory(bytes) => {
                        self.stage = Stage::Footer;
                        if !bytes.is_empty() {
                            return Ok(Some(std::mem::take(bytes)));
                        }
                    }
                    Payload::File { path, handle, .. } => {
                        let Some(file) = handle.as_mut() else {
                            self.stage = Stage::Footer;
                            continue;
                        };
                        let mut window = vec![0u8; UPLOAD_WINDOW];
                        let read = file
                            .read(&mut window)
                            .await
                            .map_err(|e| TransferError::read_file(path.clone(), e))?;
                        if read == 0 {
                            *handle = None;
                            self.stage = Stage::Footer;
                        } else {
                            window.truncate(read);
                            return Ok(Some(Bytes::from(window)));
                        }
                    }
                },
                Stage::Footer => {
                    self.stage = Stage::Done;
                    if !self.footer.is_empty() {
                        return Ok(Some(std::mem::take(&mut self.footer)));
                    }
                }
                Stage::Done => return Ok(None),
            }
        }
    }
}

/// Streams every segment in order.
pub(crate) fn stream_segments(
    segments: Vec<Segment>,
) -> impl Stream<Item = Result<Bytes, TransferError>> + Send + 'static {
    let queue: VecDeque<Segment> = segments.into();
    futures_util::stream::try_unfold(queue, |mut queue| async move {
        while let Some(segment) = queue.front_mut() {
            if let Some(chunk) = segment.next_chunk().await? {
                return Ok(Some((chunk, queue)));
            }
            queue.pop_front();
        }
        Ok::<_, TransferError>(None)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_memory_segment_emits_header_payload_footer() {
        let mut segment = Segment::new(
            Bytes::from_static(b"<"),
            Payload::memory(Bytes::from_static(b"body")),
            Bytes::from_static(b">"),
        );
        assert_eq!(segment.len(), Some(6));
        assert_eq!(segment.next_chunk().await.unwrap().unwrap(), "<");
        assert_eq!(segment.next_chunk().await.unwrap().unwrap(), "body");
        assert_eq!(segment.next_chunk().await.unwrap().unwrap(), ">");
        assert!(segment.next_chunk().await.unwrap().is_none());
        assert!(segment.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_framing_is_skipped() {
        let mut segment = Segment::new(
            Bytes::new(),
            Payload::memory(Bytes::new()),
            Bytes::new(),
        );
        assert!(segment.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_payload_reads_in_windows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..(UPLOAD_WINDOW * 2 + 10)).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();

        let payload = Payload::open_file(file.path()).await.unwrap();
        let mut segment = Segment::new(Bytes::new(), payload, Bytes::new());

        let mut chunks = Vec::new();
        while let Some(chunk) = segment.next_chunk().await.unwrap() {
            assert!(chunk.len() <= UPLOAD_WINDOW);
            chunks.push(chunk);
        }
        assert!(chunks.len() >= 3);
        assert_eq!(chunks.concat(), data);
    }
}
