//! URL completion for configured targets and proxies.

use url::Url;

use crate::error::TransferError;

/// Parses `raw`, prefixing `default_scheme://` when it has no scheme.
///
/// # Errors
///
/// Returns [`TransferError::MalformedUrl`] for empty or unparseable input.
pub fn complete_url(raw: &str, default_scheme: &str) -> Result<Url, TransferError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransferError::malformed_url(raw));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{default_scheme}://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|_| TransferError::malformed_url(raw))?;
    if url.cannot_be_a_base() || (url.host_str().is_none() && is_network_scheme(url.scheme())) {
        return Err(TransferError::malformed_url(raw));
    }
    Ok(url)
}

/// Replaces the port of `url`.
pub(crate) fn with_port(mut url: Url, port: u16) -> Result<Url, TransferError> {
    url.set_port(Some(port))
        .map_err(|()| TransferError::malformed_url(url.as_str()))?;
    Ok(url)
}

fn is_network_scheme(scheme: &str) -> bool {
    matches!(scheme, "http" | "https")
}
