//! Easy-HTTP Core Library
//!
//! An option-driven HTTP transfer engine in the style of an "easy handle":
//! configure a [`Session`] with options, call [`Session::execute`], then
//! query the error code and transfer info.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Option registry and per-session configuration store
//! - [`transfer`] - Protocol handlers, the redirect loop and the handler registry
//! - [`upload`] - Request body sources, multipart forms and streaming
//! - [`download`] - Response sinks and the scatter-gather buffer
//! - [`cookies`] - Cookie jar with Netscape file persistence
//! - [`error`] - Numeric error codes and error translation
//! - [`multi`] - Concurrent execution of many sessions

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod cookies;
pub mod download;
pub mod error;
pub mod info;
pub mod multi;
pub mod session;
pub mod transfer;
pub mod upload;

use serde::Serialize;

// Re-export commonly used types
pub use config::{OptionKey, OptionValue, SessionConfig, ValueShape};
pub use cookies::{Cookie, CookieJar};
pub use download::{ByteSink, ScatterGatherBuffer, SinkRef, WriterSink};
pub use error::{ErrorCode, OptionError, TransferError};
pub use info::{ExecResult, ExecutionOutcome, InfoKey, InfoValue};
pub use multi::{Dispatcher, SessionId, TransferDone};
pub use session::Session;
pub use transfer::{Execution, HandlerRegistry, HttpHandler, ProtocolHandler, complete_url};
pub use upload::{Form, FormPart, UploadSource};

/// Engine version and the protocols it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// Crate version.
    pub version: &'static str,
    /// URL schemes handled by the default registry.
    pub protocols: Vec<String>,
}

/// Reports the engine version and supported protocols.
#[must_use]
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        protocols: HandlerRegistry::with_defaults()
            .schemes()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}
