//! Byte sinks for response bodies and header lines.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use super::ScatterGatherBuffer;

/// Destination for received bytes.
///
/// `write` returns how many bytes were accepted; accepting fewer than offered
/// aborts the transfer with a write error.
pub trait ByteSink: Send {
    /// Accepts a chunk of bytes.
    ///
    /// # Errors
    ///
    /// Any I/O error aborts the transfer.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

impl<F> ByteSink for F
where
    F: FnMut(&[u8]) -> io::Result<usize> + Send,
{
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self(data)
    }
}

/// Adapts any [`Write`] into a [`ByteSink`].
#[derive(Debug)]
pub struct WriterSink<W>(pub W);

impl<W: Write + Send> ByteSink for WriterSink<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.write_all(data)?;
        self.0.flush()?;
        Ok(data.len())
    }
}

impl ByteSink for ScatterGatherBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.append(data);
        Ok(data.len())
    }
}

/// Shared handle to a sink, stored as an option value.
///
/// The lock is only held for a single synchronous write.
#[derive(Clone)]
pub struct SinkRef(Arc<Mutex<dyn ByteSink>>);

impl SinkRef {
    /// Wraps a sink.
    pub fn new(sink: impl ByteSink + 'static) -> Self {
        Self(Arc::new(Mutex::new(sink)))
    }

    /// Wraps a writer such as a file.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self::new(WriterSink(writer))
    }

    /// Wraps a callback returning the number of bytes it accepted.
    pub fn from_fn(callback: impl FnMut(&[u8]) -> io::Result<usize> + Send + 'static) -> Self {
        Self::new(callback)
    }

    /// Writes all of `data` or fails.
    pub(crate) fn write_all(&self, data: &[u8]) -> io::Result<()> {
        let mut sink = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let accepted = sink.write(data)?;
        if accepted == data.len() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sink accepted {accepted} of {} bytes", data.len()),
            ))
        }
    }
}

impl fmt::Debug for SinkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SinkRef(..)")
    }
}

/// The one sink a transfer delivers its body into.
///
/// Chosen once per execution; precedence is callback, then output writer,
/// then memory (when the body is returned), then standard output.
#[derive(Debug)]
pub(crate) enum DownloadSink {
    Callback(SinkRef),
    Output(SinkRef),
    Memory(ScatterGatherBuffer),
    Stdout,
}

impl DownloadSink {
    pub(crate) fn select(
        callback: Option<&SinkRef>,
        output: Option<&SinkRef>,
        return_transfer: bool,
        declared: Option<u64>,
    ) -> Self {
        if let Some(sink) = callback {
            Self::Callback(sink.clone())
        } else if let Some(sink) = output {
            Self::Output(sink.clone())
        } else if return_transfer {
            Self::Memory(ScatterGatherBuffer::for_declared_length(declared))
        } else {
            Self::Stdout
        }
    }

    pub(crate) fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Callback(sink) | Self::Output(sink) => sink.write_all(data),
            Self::Memory(buffer) => {
                buffer.append(data);
                Ok(())
            }
            Self::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(data)?;
                out.flush()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_sink_receives_bytes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_sink = Arc::clone(&seen);
        let sink = SinkRef::from_fn(move |data: &[u8]| {
            seen_in_sink.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        });
        sink.write_all(b"hello").unwrap();
        sink.write_all(b" world").unwrap();
        assert_eq!(&*seen.lock().unwrap(), b"hello world");
    }

    #[test]
    fn test_short_write_is_error() {
        let sink = SinkRef::from_fn(|data: &[u8]| Ok(data.len() / 2));
        let err = sink.write_all(b"abcd").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn test_writer_sink_writes_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sink = SinkRef::from_writer(file.reopen().unwrap());
        sink.write_all(b"data").unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), b"data");
    }

    #[test]
    fn test_select_precedence() {
        let callback = SinkRef::from_fn(|d: &[u8]| Ok(d.len()));
        let output = SinkRef::from_writer(Vec::<u8>::new());

        let sink = DownloadSink::select(Some(&callback), Some(&output), true, None);
        assert!(matches!(sink, DownloadSink::Callback(_)));
        let sink = DownloadSink::select(None, Some(&output), true, None);
        assert!(matches!(sink, DownloadSink::Output(_)));
        let sink = DownloadSink::select(None, None, true, Some(3));
        assert!(matches!(sink, DownloadSink::Memory(_)));
        let sink = DownloadSink::select(None, None, false, None);
        assert!(matches!(sink, DownloadSink::Stdout));
    }
}
