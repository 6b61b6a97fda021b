//! Builds the HTTP client for one execution.
//!
//! Redirects and cookies are handled by the orchestrator, so the client is
//! built with both disabled. Timeouts, proxy, decompression and the client
//! certificate come from the session configuration.

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Identity, Proxy};
use tracing::{debug, instrument};

use super::target::{complete_url, with_port};
use super::user_agent::default_user_agent;
use crate::config::{HttpVersionPref, SessionConfig};
use crate::error::TransferError;

/// Proxy URL the client will use, or `None` for a direct connection.
///
/// The configured port applies only when the address carries none.
pub(crate) fn proxy_url(config: &SessionConfig) -> Result<Option<url::Url>, TransferError> {
    let Some(address) = config.proxy().filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };
    let url = complete_url(address, "http")?;
    let url = if url.port().is_none() {
        with_port(url, config.proxy_port())?
    } else {
        url
    };
    Ok(Some(url))
}

/// Builds a client honouring the session's transport options.
///
/// # Errors
///
/// [`TransferError::BadCertificateFile`] when the client certificate cannot
/// be read or parsed, [`TransferError::MalformedUrl`] for an unusable proxy
/// address.
#[instrument(level = "debug", skip(config))]
pub(crate) fn build_client(config: &SessionConfig) -> Result<Client, TransferError> {
    let mut builder = base_client_builder(config);

    match config.proxy() {
        Some(address) if address.trim().is_empty() => builder = builder.no_proxy(),
        Some(address) => {
            let Some(url) = proxy_url(config)? else {
                return Err(TransferError::malformed_url(address));
            };
            let mut proxy =
                Proxy::all(url.as_str()).map_err(|_| TransferError::malformed_url(address))?;
            if let Some((user, pass)) = config.proxy_credentials() {
                proxy = proxy.basic_auth(user, pass);
            }
            debug!(proxy = %url, "using configured proxy");
            builder = builder.proxy(proxy);
        }
        None => {}
    }

    if let Some(path) = config.ssl_cert() {
        let pem = std::fs::read(path)
            .map_err(|e| TransferError::bad_certificate(path, e.to_string()))?;
        let identity = Identity::from_pem(&pem)
            .map_err(|e| TransferError::bad_certificate(path, e.to_string()))?;
        debug!(cert = %path.display(), "attached client certificate");
        builder = builder.identity(identity);
    }

    builder.build().map_err(|e| TransferError::Transport {
        url: config.url().unwrap_or_default().to_string(),
        source: e,
    })
}

fn base_client_builder(config: &SessionConfig) -> ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.timeout())
        .redirect(Policy::none())
        .gzip(config.encoding().is_some())
        .user_agent(
            config
                .user_agent()
                .map_or_else(default_user_agent, str::to_string),
        );
    if config.http_version() != HttpVersionPref::Default {
        builder = builder.http1_only();
    }
    builder
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::OptionKey;
    use std::io::Write;

    #[test]
    fn test_proxy_port_applied_when_missing() {
        let mut config = SessionConfig::new();
        config.set(OptionKey::Proxy, "proxy.local".into()).unwrap();
        let url = proxy_url(&config).unwrap().unwrap();
        assert_eq!(url.as_str(), "http://proxy.local:1080/");

        config.set(OptionKey::Proxy, "proxy.local:3128".into()).unwrap();
        config.set(OptionKey::ProxyPort, 9999.into()).unwrap();
        let url = proxy_url(&config).unwrap().unwrap();
        assert_eq!(url.port(), Some(3128));
    }

    #[test]
    fn test_empty_proxy_means_direct() {
        let mut config = SessionConfig::new();
        config.set(OptionKey::Proxy, "".into()).unwrap();
        assert!(proxy_url(&config).unwrap().is_none());
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn test_missing_certificate_file() {
        let mut config = SessionConfig::new();
        config
            .set(OptionKey::SslCert, "/no/such/cert.pem".into())
            .unwrap();
        let err = build_client(&config).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::BadCertificateFile);
    }

    #[test]
    fn test_unparseable_certificate_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a certificate").unwrap();
        let mut config = SessionConfig::new();
        config.set(OptionKey::SslCert, file.path().into()).unwrap();
        let err = build_client(&config).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::BadCertificateFile);
    }
}
