//! Protocol handlers and the scheme-keyed registry that selects them.
//!
//! A [`ProtocolHandler`] runs one execution for a session: it owns every
//! network attempt (including redirects), delivers the final body and
//! records an [`ExecutionOutcome`] that later answers info queries.
//!
//! # Object Safety
//!
//! The trait uses `async_trait` so handlers can be stored as
//! `Arc<dyn ProtocolHandler>` in the registry.

mod client;
mod http;
mod target;
mod user_agent;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::SessionConfig;
use crate::cookies::CookieJar;
use crate::error::TransferError;
use crate::info::{ExecResult, ExecutionOutcome, InfoKey, InfoValue};

pub use self::http::HttpHandler;
pub use self::target::complete_url;
pub use self::user_agent::default_user_agent;

/// Everything a handler reports back after one execution.
#[derive(Debug)]
pub struct Execution {
    /// What `execute` returns to the caller.
    pub result: ExecResult,
    /// Facts for info queries.
    pub outcome: ExecutionOutcome,
    /// Why the execution stopped early or only partly succeeded.
    pub error: Option<TransferError>,
}

impl Execution {
    /// A failed execution with no response.
    #[must_use]
    pub fn failed(error: TransferError, mut outcome: ExecutionOutcome) -> Self {
        outcome.error = error.code();
        Self {
            result: ExecResult::Failed,
            outcome,
            error: Some(error),
        }
    }
}

/// A handler for one or more URL schemes.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    /// URL scheme served, e.g. `https`.
    fn scheme(&self) -> &'static str;

    /// Port used when the URL carries none.
    fn default_port(&self) -> u16;

    /// Runs one execution against `url`, merging cookies into `jar`.
    async fn execute(
        &self,
        url: url::Url,
        config: &SessionConfig,
        jar: &mut CookieJar,
    ) -> Execution;

    /// Answers an info query about a previous execution.
    fn info(&self, outcome: &ExecutionOutcome, key: InfoKey) -> Option<InfoValue>;
}

/// Scheme-keyed collection of protocol handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ProtocolHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with HTTP and HTTPS handlers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HttpHandler::http()));
        registry.register(Arc::new(HttpHandler::https()));
        registry
    }

    /// Registers a handler for its scheme, replacing any previous one.
    #[tracing::instrument(skip(self, handler), fields(scheme = handler.scheme()))]
    pub fn register(&mut self, handler: Arc<dyn ProtocolHandler>) {
        debug!(port = handler.default_port(), "registering protocol handler");
        self.handlers
            .insert(handler.scheme().to_ascii_lowercase(), handler);
    }

    /// Handler for `scheme`, if registered.
    #[must_use]
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn ProtocolHandler>> {
        self.handlers.get(&scheme.to_ascii_lowercase()).cloned()
    }

    /// Registered schemes, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
