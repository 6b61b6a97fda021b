//! Error types for the transfer engine.
//!
//! Two families of errors exist:
//! - [`OptionError`] is returned synchronously from option setters and never
//!   touches the network.
//! - [`TransferError`] describes why an execution failed. It is never thrown
//!   at the caller of [`Session::execute`](crate::Session::execute); the session
//!   records it and exposes its stable [`ErrorCode`] afterwards.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::instrument;

use crate::config::{OptionKey, ValueShape};

/// Stable, numbered error taxonomy exposed to callers after an execution.
///
/// The numbers match the ones used by the reference C library so that hosts
/// comparing against well-known constants keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// No error.
    #[default]
    Ok = 0,
    /// The URL scheme has no registered protocol handler.
    UnsupportedProtocol = 1,
    /// The URL (or a redirect `Location`) could not be parsed.
    UrlMalformat = 3,
    /// The proxy host name could not be resolved.
    CouldntResolveProxy = 5,
    /// The target host name could not be resolved.
    CouldntResolveHost = 6,
    /// The host or proxy refused or could not be reached.
    CouldntConnect = 7,
    /// Declared and received body length disagree.
    PartialFile = 18,
    /// HTTP status >= 400 with fail-on-error enabled.
    HttpReturnedError = 22,
    /// A sink accepted fewer bytes than it was given or failed.
    WriteError = 23,
    /// The connect timeout or overall timeout elapsed.
    OperationTimedOut = 28,
    /// TLS handshake failed.
    SslConnectError = 35,
    /// The upload source file could not be opened or read.
    ReadFileError = 37,
    /// A value of the wrong shape was passed for an option.
    BadFunctionArgument = 43,
    /// The redirect chain exceeded the configured maximum.
    TooManyRedirects = 47,
    /// The option or option value is outside the supported subset.
    UnknownOption = 48,
    /// Catch-all for transport failures not otherwise classified.
    TransportFailure = 56,
    /// The peer certificate could not be verified.
    SslCacert = 60,
    /// The client certificate file could not be loaded.
    BadCertificateFile = 77,
}

impl ErrorCode {
    /// Returns the numeric value of this code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns true for [`ErrorCode::Ok`].
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Short human-readable description, in the spirit of `strerror`.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "No error",
            Self::UnsupportedProtocol => "Unsupported protocol",
            Self::UrlMalformat => "URL using bad/illegal format or missing URL",
            Self::CouldntResolveProxy => "Couldn't resolve proxy name",
            Self::CouldntResolveHost => "Couldn't resolve host name",
            Self::CouldntConnect => "Couldn't connect to server",
            Self::PartialFile => "Transferred a partial file",
            Self::HttpReturnedError => "HTTP response code said error",
            Self::WriteError => "Failed writing received data to disk/application",
            Self::OperationTimedOut => "Connection time-out",
            Self::SslConnectError => "SSL connect error",
            Self::ReadFileError => "Couldn't read a file",
            Self::BadFunctionArgument => "A libcurl function was given a bad argument",
            Self::TooManyRedirects => "Number of redirects hit maximum amount",
            Self::UnknownOption => "An unknown option was passed in to libcurl",
            Self::TransportFailure => "Failure when receiving data from the peer",
            Self::SslCacert => "Peer certificate cannot be authenticated with given CA certificates",
            Self::BadCertificateFile => "Problem with the SSL CA cert (path? access rights?)",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

/// Errors reported synchronously when setting an option.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    /// The value could not be coerced to the shape the option accepts.
    #[error("invalid value for {key:?}: expected {expected}")]
    InvalidOption {
        /// The option being set.
        key: OptionKey,
        /// The accepted value shape.
        expected: ValueShape,
    },

    /// The option, or this value of it, is outside the supported subset.
    #[error("unsupported option {option}: {reason}")]
    Unsupported {
        /// Option name or numeric identifier.
        option: String,
        /// Why the value cannot be honoured.
        reason: String,
    },
}

impl OptionError {
    /// Creates a shape mismatch error.
    pub fn invalid(key: OptionKey, expected: ValueShape) -> Self {
        Self::InvalidOption { key, expected }
    }

    /// Creates an unsupported-option error.
    pub fn unsupported(option: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            option: option.to_string(),
            reason: reason.into(),
        }
    }

    /// Maps the option error onto the stable taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidOption { .. } => ErrorCode::BadFunctionArgument,
            Self::Unsupported { .. } => ErrorCode::UnknownOption,
        }
    }
}

/// Reasons an execution stopped without a usable response.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The URL is missing or malformed, or a redirect `Location` could not be resolved.
    #[error("malformed URL: {url}")]
    MalformedUrl {
        /// The offending URL text.
        url: String,
    },

    /// No protocol handler is registered for the URL scheme.
    #[error("protocol \"{scheme}\" not supported")]
    UnsupportedProtocol {
        /// The URL scheme.
        scheme: String,
    },

    /// The configuration holds a value the engine cannot honour.
    #[error(transparent)]
    Option(#[from] OptionError),

    /// Host name resolution failed.
    #[error("could not resolve host for {url}: {source}")]
    ResolveHost {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Proxy name resolution failed.
    #[error("could not resolve proxy {proxy}: {source}")]
    ResolveProxy {
        /// The configured proxy address.
        proxy: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The host or proxy could not be reached.
    #[error("couldn't connect to host for {url}: {source}")]
    Connect {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The connect or overall timeout elapsed.
    #[error("operation timed out for {url}")]
    Timeout {
        /// The URL being fetched.
        url: String,
    },

    /// TLS handshake failure.
    #[error("SSL connect error for {url}: {source}")]
    Handshake {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The peer certificate was not trusted.
    #[error("peer certificate not trusted for {url}: {source}")]
    UntrustedPeer {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The client certificate could not be loaded.
    #[error("unable to use client certificate {path}: {reason}")]
    BadCertificateFile {
        /// Path to the certificate file.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// The redirect chain exceeded the configured maximum.
    #[error("maximum ({max}) redirects followed")]
    TooManyRedirects {
        /// The configured maximum.
        max: i64,
    },

    /// The server returned an error status and fail-on-error is enabled.
    #[error("the requested URL returned error: {status}")]
    HttpReturned {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Fewer body bytes arrived than the response declared.
    #[error("transfer closed with {} bytes remaining to read", expected.saturating_sub(*received))]
    PartialFile {
        /// Declared content length.
        expected: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// A sink failed or accepted fewer bytes than given.
    #[error("failed writing received data: {source}")]
    Write {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The upload source file could not be opened or read.
    #[error("couldn't read file {path}: {source}")]
    ReadFile {
        /// The file being uploaded.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Transport failure not otherwise classified.
    #[error("transport failure for {url}: {source}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },
}

impl TransferError {
    /// Creates a malformed URL error.
    pub fn malformed_url(url: impl Into<String>) -> Self {
        Self::MalformedUrl { url: url.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a read-file error for an upload source.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a sink write error.
    pub fn write(source: std::io::Error) -> Self {
        Self::Write { source }
    }

    /// Creates a bad client certificate error.
    pub fn bad_certificate(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::BadCertificateFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Maps the error onto the stable taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedUrl { .. } => ErrorCode::UrlMalformat,
            Self::UnsupportedProtocol { .. } => ErrorCode::UnsupportedProtocol,
            Self::Option(inner) => inner.code(),
            Self::ResolveHost { .. } => ErrorCode::CouldntResolveHost,
            Self::ResolveProxy { .. } => ErrorCode::CouldntResolveProxy,
            Self::Connect { .. } => ErrorCode::CouldntConnect,
            Self::Timeout { .. } => ErrorCode::OperationTimedOut,
            Self::Handshake { .. } => ErrorCode::SslConnectError,
            Self::UntrustedPeer { .. } => ErrorCode::SslCacert,
            Self::BadCertificateFile { .. } => ErrorCode::BadCertificateFile,
            Self::TooManyRedirects { .. } => ErrorCode::TooManyRedirects,
            Self::HttpReturned { .. } => ErrorCode::HttpReturnedError,
            Self::PartialFile { .. } => ErrorCode::PartialFile,
            Self::Write { .. } => ErrorCode::WriteError,
            Self::ReadFile { .. } => ErrorCode::ReadFileError,
            Self::Transport { .. } => ErrorCode::TransportFailure,
        }
    }
}

/// Translates a transport error from the HTTP stack into the taxonomy.
///
/// The request URL is stripped before the cause chain is inspected, so
/// words in a host or path never influence the result.
///
/// | Condition | Variant |
/// |-----------|---------|
/// | timeout | `Timeout` |
/// | refused/reset/unreachable socket | `Connect` |
/// | DNS failure (proxy configured) | `ResolveProxy` |
/// | DNS failure | `ResolveHost` |
/// | certificate verification | `UntrustedPeer` |
/// | other TLS/handshake | `Handshake` |
/// | connect failure | `Connect` |
/// | anything else | `Transport` |
#[instrument(level = "debug", skip(source), fields(error = %source))]
pub fn classify_transport_error(
    url: &str,
    proxy: Option<&str>,
    source: reqwest::Error,
) -> TransferError {
    if source.is_timeout() {
        return TransferError::timeout(url);
    }

    let source = source.without_url();
    if source.is_connect() && has_socket_failure(&source) {
        return TransferError::Connect {
            url: url.to_string(),
            source,
        };
    }

    let chain = error_chain_text(&source);

    if is_resolve_error(&chain) {
        return match proxy {
            Some(proxy) => TransferError::ResolveProxy {
                proxy: proxy.to_string(),
                source,
            },
            None => TransferError::ResolveHost {
                url: url.to_string(),
                source,
            },
        };
    }

    if chain.contains("certificate") || chain.contains("unknownissuer") {
        return TransferError::UntrustedPeer {
            url: url.to_string(),
            source,
        };
    }

    if chain.contains("tls") || chain.contains("ssl") || chain.contains("handshake") {
        return TransferError::Handshake {
            url: url.to_string(),
            source,
        };
    }

    if source.is_connect() {
        return TransferError::Connect {
            url: url.to_string(),
            source,
        };
    }

    TransferError::Transport {
        url: url.to_string(),
        source,
    }
}

/// True when some cause in the chain is a socket-level I/O failure.
fn has_socket_failure(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = error.source();
    while let Some(inner) = current {
        if let Some(io) = inner.downcast_ref::<std::io::Error>()
            && matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::AddrNotAvailable
                    | std::io::ErrorKind::NetworkUnreachable
                    | std::io::ErrorKind::HostUnreachable
            )
        {
            return true;
        }
        current = inner.source();
    }
    false
}

/// Flattens an error and all of its sources into one lowercase string.
fn error_chain_text(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut current = error.source();
    while let Some(inner) = current {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        current = inner.source();
    }
    text.to_lowercase()
}

fn is_resolve_error(chain: &str) -> bool {
    chain.contains("dns error")
        || chain.contains("failed to lookup address")
        || chain.contains("name or service not known")
        || chain.contains("no such host")
        || chain.contains("nodename nor servname")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numbers_are_stable() {
        assert_eq!(ErrorCode::Ok.as_i32(), 0);
        assert_eq!(ErrorCode::CouldntResolveHost.as_i32(), 6);
        assert_eq!(ErrorCode::CouldntConnect.as_i32(), 7);
        assert_eq!(ErrorCode::PartialFile.as_i32(), 18);
        assert_eq!(ErrorCode::OperationTimedOut.as_i32(), 28);
        assert_eq!(ErrorCode::TooManyRedirects.as_i32(), 47);
        assert_eq!(ErrorCode::BadCertificateFile.as_i32(), 77);
    }

    #[test]
    fn test_error_code_display_includes_number() {
        let msg = ErrorCode::OperationTimedOut.to_string();
        assert!(msg.contains("time-out"), "unexpected: {msg}");
        assert!(msg.contains("28"), "unexpected: {msg}");
    }

    #[test]
    fn test_option_error_codes() {
        let invalid = OptionError::invalid(OptionKey::Timeout, ValueShape::Integer);
        assert_eq!(invalid.code(), ErrorCode::BadFunctionArgument);

        let unsupported = OptionError::unsupported("CURLOPT_PROXYTYPE", "only HTTP proxies");
        assert_eq!(unsupported.code(), ErrorCode::UnknownOption);
        assert!(unsupported.to_string().contains("only HTTP proxies"));
    }

    #[test]
    fn test_transfer_error_codes() {
        assert_eq!(
            TransferError::timeout("http://x").code(),
            ErrorCode::OperationTimedOut
        );
        assert_eq!(
            TransferError::TooManyRedirects { max: 3 }.code(),
            ErrorCode::TooManyRedirects
        );
        assert_eq!(
            TransferError::malformed_url("::").code(),
            ErrorCode::UrlMalformat
        );
        assert_eq!(
            TransferError::bad_certificate("/tmp/c.pem", "no key").code(),
            ErrorCode::BadCertificateFile
        );
        assert_eq!(
            TransferError::from(OptionError::unsupported("x", "y")).code(),
            ErrorCode::UnknownOption
        );
    }

    #[test]
    fn test_partial_file_display_reports_remaining() {
        let error = TransferError::PartialFile {
            expected: 100,
            received: 80,
        };
        assert!(error.to_string().contains("20 bytes remaining"));
    }

    #[test]
    fn test_resolve_error_detection() {
        assert!(is_resolve_error("error sending request: dns error: failed"));
        assert!(is_resolve_error("failed to lookup address information"));
        assert!(!is_resolve_error("connection refused"));
    }
}
