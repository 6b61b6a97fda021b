//! Download engine: response sinks and in-memory buffering.
//!
//! A transfer delivers its body into exactly one sink, chosen once per
//! execution:
//!
//! 1. the write callback, when set
//! 2. the output writer, when set
//! 3. a [`ScatterGatherBuffer`], when the body is returned to the caller
//! 4. standard output otherwise
//!
//! When the response head is requested it is written to the sink before the
//! body, or spliced into the buffer's reserved prefix for in-memory bodies.

mod buffer;
mod deliver;
mod sink;

pub use buffer::ScatterGatherBuffer;
pub use sink::{ByteSink, SinkRef, WriterSink};

pub(crate) use deliver::{Delivery, deliver, head_lines, render_head};
pub(crate) use sink::DownloadSink;
