//! The easy-style session: options in, one transfer out.
//!
//! # Example
//!
//! ```no_run
//! use easy_http::{ExecResult, OptionKey, Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::with_url("https://example.com/");
//! session.set_option(OptionKey::ReturnTransfer, true)?;
//! session.set_option(OptionKey::FollowLocation, true)?;
//! if let ExecResult::Content(body) = session.execute().await {
//!     println!("{} bytes", body.len());
//! } else {
//!     eprintln!("failed: {}", session.error_message());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::{OptionKey, OptionValue, SessionConfig};
use crate::cookies::CookieJar;
use crate::error::{ErrorCode, OptionError, TransferError};
use crate::info::{ExecResult, ExecutionOutcome, InfoKey, InfoValue};
use crate::transfer::{HandlerRegistry, ProtocolHandler, complete_url};

/// Recorded facts about the last execution, plus the handler that can read them.
struct LastExecution {
    handler: Arc<dyn ProtocolHandler>,
    outcome: ExecutionOutcome,
}

/// One configurable transfer handle.
///
/// Options persist across executions; the cookie jar accumulates across
/// executions and is written to the configured jar file on close.
pub struct Session {
    config: SessionConfig,
    jar: CookieJar,
    registry: Arc<HandlerRegistry>,
    last: Option<LastExecution>,
    error_code: ErrorCode,
    error_message: Option<String>,
    closed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a session with default options and the HTTP/HTTPS handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Arc::new(HandlerRegistry::with_defaults()))
    }

    /// Creates a session targeting `url`.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.config.set(OptionKey::Url, OptionValue::Str(url.into())).ok();
        session
    }

    /// Creates a session that resolves schemes through `registry`.
    #[must_use]
    pub fn with_registry(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            config: SessionConfig::new(),
            jar: CookieJar::new(),
            registry,
            last: None,
            error_code: ErrorCode::Ok,
            error_message: None,
            closed: false,
        }
    }

    /// Sets one option.
    ///
    /// # Errors
    ///
    /// See [`SessionConfig::set`]. The error is also recorded as the session's
    /// last error.
    pub fn set_option(
        &mut self,
        key: OptionKey,
        value: impl Into<OptionValue>,
    ) -> Result<(), OptionError> {
        self.config.set(key, value.into()).inspect_err(|e| {
            warn!(option = %key, error = %e, "rejected option");
            self.error_code = e.code();
            self.error_message = Some(e.to_string());
        })
    }

    /// Sets an option by its numeric code.
    ///
    /// # Errors
    ///
    /// [`OptionError::Unsupported`] for unknown codes, otherwise as
    /// [`set_option`](Self::set_option).
    pub fn set_option_code(
        &mut self,
        code: i64,
        value: impl Into<OptionValue>,
    ) -> Result<(), OptionError> {
        let key = OptionKey::from_code(code).inspect_err(|e| {
            self.error_code = e.code();
            self.error_message = Some(e.to_string());
        })?;
        self.set_option(key, value)
    }

    /// Applies every option in order, continuing past failures.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub fn set_options<I, V>(&mut self, options: I) -> Result<(), OptionError>
    where
        I: IntoIterator<Item = (OptionKey, V)>,
        V: Into<OptionValue>,
    {
        let mut first_error = None;
        for (key, value) in options {
            if let Err(e) = self.set_option(key, value) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Current options.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Cookies accumulated so far.
    #[must_use]
    pub fn cookie_jar(&self) -> &CookieJar {
        &self.jar
    }

    /// Runs one transfer with the current options.
    ///
    /// Never returns an error directly: on failure the result is
    /// [`ExecResult::Failed`] and [`error_code`](Self::error_code) says why.
    /// A partial body is still returned, with [`ErrorCode::PartialFile`] recorded.
    #[instrument(skip(self), fields(url = self.config.url().unwrap_or_default()))]
    pub async fn execute(&mut self) -> ExecResult {
        self.last = None;
        self.error_code = ErrorCode::Ok;
        self.error_message = None;

        self.load_pending_cookie_files();

        let url = match self.target() {
            Ok(url) => url,
            Err(e) => return self.fail(e),
        };
        let Some(handler) = self.registry.get(url.scheme()) else {
            let scheme = url.scheme().to_string();
            return self.fail(TransferError::UnsupportedProtocol { scheme });
        };

        debug!(scheme = handler.scheme(), "dispatching to protocol handler");
        let execution = handler.execute(url, &self.config, &mut self.jar).await;
        if let Some(error) = &execution.error {
            self.error_code = error.code();
            self.error_message = Some(error.to_string());
        }
        info!(code = self.error_code.as_i32(), "execution finished");
        self.last = Some(LastExecution {
            handler,
            outcome: execution.outcome,
        });
        execution.result
    }

    fn target(&self) -> Result<url::Url, TransferError> {
        let raw = self
            .config
            .url()
            .ok_or_else(|| TransferError::malformed_url(""))?;
        let url = complete_url(raw, "http")?;
        match self.config.port() {
            Some(port) => {
                let mut url = url;
                url.set_port(Some(port))
                    .map_err(|()| TransferError::malformed_url(raw))?;
                Ok(url)
            }
            None => Ok(url),
        }
    }

    fn fail(&mut self, error: TransferError) -> ExecResult {
        warn!(error = %error, "execution failed before any request");
        self.error_code = error.code();
        self.error_message = Some(error.to_string());
        ExecResult::Failed
    }

    fn load_pending_cookie_files(&mut self) {
        for path in self.config.take_cookie_files() {
            match self.jar.load_file(&path) {
                Ok(count) => debug!(path = %path.display(), count, "loaded cookies"),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping cookie file"),
            }
        }
    }

    /// Error code of the last execution (or rejected option).
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    /// Human-readable message for [`error_code`](Self::error_code); empty when OK.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.error_message.clone().unwrap_or_default()
    }

    /// Facts recorded by the last execution.
    #[must_use]
    pub fn outcome(&self) -> Option<&ExecutionOutcome> {
        self.last.as_ref().map(|last| &last.outcome)
    }

    /// Answers an info query about the last execution.
    ///
    /// `None` when nothing has executed or the handler does not know the key.
    #[must_use]
    pub fn info(&self, key: InfoKey) -> Option<InfoValue> {
        let last = self.last.as_ref()?;
        last.handler.info(&last.outcome, key)
    }

    /// Writes the cookie jar (when configured) and releases the session.
    pub fn close(mut self) {
        self.flush_cookie_jar();
    }

    fn flush_cookie_jar(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(path) = self.config.cookie_jar() {
            self.jar.flush_to(path);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.flush_cookie_jar();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.config.url())
            .field("cookies", &self.jar.len())
            .field("error_code", &self.error_code)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url_is_malformed() {
        let mut session = Session::new();
        assert_eq!(session.execute().await, ExecResult::Failed);
        assert_eq!(session.error_code(), ErrorCode::UrlMalformat);
        assert!(session.info(InfoKey::EffectiveUrl).is_none());
    }

    #[tokio::test]
    async fn test_unregistered_scheme_is_unsupported() {
        let mut session = Session::with_url("ftp://files.example.com/a.txt");
        assert_eq!(session.execute().await, ExecResult::Failed);
        assert_eq!(session.error_code(), ErrorCode::UnsupportedProtocol);
        assert!(session.error_message().contains("ftp"));
    }

    #[tokio::test]
    async fn test_empty_registry_supports_nothing() {
        let mut session = Session::with_registry(Arc::new(HandlerRegistry::new()));
        session.set_option(OptionKey::Url, "http://example.com").unwrap();
        assert_eq!(session.execute().await, ExecResult::Failed);
        assert_eq!(session.error_code(), ErrorCode::UnsupportedProtocol);
    }

    #[test]
    fn test_rejected_option_records_error() {
        let mut session = Session::new();
        let err = session.set_option(OptionKey::ProxyType, 5).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownOption);
        assert_eq!(session.error_code(), ErrorCode::UnknownOption);
    }

    #[test]
    fn test_set_option_by_code() {
        let mut session = Session::new();
        session.set_option_code(10002, "http://example.com").unwrap();
        assert_eq!(session.config().url(), Some("http://example.com"));
        assert!(session.set_option_code(1, true).is_err());
    }

    #[test]
    fn test_set_options_applies_all_and_reports_first_error() {
        let mut session = Session::new();
        let result = session.set_options([
            (OptionKey::Url, OptionValue::from("http://a")),
            (OptionKey::Timeout, OptionValue::from("never")),
            (OptionKey::FollowLocation, OptionValue::from(true)),
        ]);
        assert!(result.is_err());
        assert_eq!(session.config().url(), Some("http://a"));
        assert!(session.config().follow_location());
    }

    #[test]
    fn test_close_writes_cookie_jar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jar.txt");
        let mut session = Session::new();
        session
            .set_option(OptionKey::CookieJar, path.to_string_lossy().into_owned())
            .unwrap();
        session.close();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Netscape HTTP Cookie File"));
    }
}
