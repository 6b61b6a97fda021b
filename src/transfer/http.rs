//! HTTP/HTTPS protocol handler.
//!
//! # Redirect chain
//!
//! Each loop iteration sends one attempt built from an immutable
//! [`AttemptContext`]. Cookies from every response are merged into the
//! session jar before the redirect decision, so later hops see them.
//!
//! | Status | Followed | Method on next hop |
//! |--------|----------|--------------------|
//! | 301, 302, 303 | when follow-location is on | GET without body (HEAD stays HEAD) |
//! | 307 | when follow-location is on | configured method, body resent |
//! | anything else | never | n/a |
//!
//! The limit is checked before each hop is followed, so a limit of `k`
//! allows `k + 1` requests in total.

use std::pin::Pin;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{
    CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, LOCATION, REFERER,
    SET_COOKIE,
};
use reqwest::{Client, Method, Response, StatusCode, Version};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::{build_client, proxy_url};
use super::{Execution, ProtocolHandler};
use crate::config::{HttpVersionPref, SessionConfig};
use crate::cookies::CookieJar;
use crate::download::{DownloadSink, deliver, head_lines, render_head};
use crate::error::{TransferError, classify_transport_error};
use crate::info::{ExecResult, ExecutionOutcome, InfoKey, InfoValue};
use crate::upload::{self, FORM_URLENCODED, UploadSource};

/// Handler for `http` or `https` URLs.
#[derive(Debug, Clone, Copy)]
pub struct HttpHandler {
    secure: bool,
}

impl HttpHandler {
    /// Plain-text HTTP handler.
    #[must_use]
    pub fn http() -> Self {
        Self { secure: false }
    }

    /// HTTPS handler.
    #[must_use]
    pub fn https() -> Self {
        Self { secure: true }
    }
}

#[async_trait]
impl ProtocolHandler for HttpHandler {
    fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    fn default_port(&self) -> u16 {
        if self.secure { 443 } else { 80 }
    }

    #[instrument(skip(self, config, jar), fields(url = %url))]
    async fn execute(&self, url: Url, config: &SessionConfig, jar: &mut CookieJar) -> Execution {
        let started = Instant::now();
        let mut outcome = ExecutionOutcome::default();
        let mut execution = match run(url, config, jar, &mut outcome).await {
            Ok((result, error)) => {
                outcome.error = error.as_ref().map(TransferError::code).unwrap_or_default();
                Execution {
                    result,
                    outcome,
                    error,
                }
            }
            Err(error) => {
                warn!(error = %error, "transfer failed");
                Execution::failed(error, outcome)
            }
        };
        execution.outcome.total_time = started.elapsed().as_secs_f64();
        execution
    }

    #[allow(clippy::cast_precision_loss)]
    fn info(&self, outcome: &ExecutionOutcome, key: InfoKey) -> Option<InfoValue> {
        let value = match key {
            InfoKey::EffectiveUrl => InfoValue::Str(outcome.effective_url.clone()?),
            InfoKey::HttpCode => InfoValue::Int(i64::from(outcome.status.unwrap_or(0))),
            InfoKey::ContentType => InfoValue::Str(outcome.content_type.clone()?),
            InfoKey::RedirectCount => InfoValue::Int(i64::from(outcome.redirect_count)),
            InfoKey::SizeDownload => InfoValue::Float(outcome.size_download as f64),
            InfoKey::SizeUpload => InfoValue::Float(outcome.size_upload as f64),
            InfoKey::ContentLengthDownload => InfoValue::Float(
                outcome.content_length_download.map_or(-1.0, |n| n as f64),
            ),
            InfoKey::HeaderSize => {
                InfoValue::Int(i64::try_from(outcome.header_size).unwrap_or(i64::MAX))
            }
            InfoKey::TotalTime => InfoValue::Float(outcome.total_time),
        };
        Some(value)
    }
}

/// Immutable description of one network attempt.
#[derive(Debug, Clone)]
struct AttemptContext {
    url: Url,
    number: u32,
    method: Method,
    send_body: bool,
    referer: Option<String>,
}

impl AttemptContext {
    fn first(url: Url, config: &SessionConfig) -> Self {
        Self {
            url,
            number: 1,
            method: config.effective_method(),
            send_body: true,
            referer: config.referer().map(str::to_string),
        }
    }

    fn follow(&self, url: Url, keep_verb: bool, config: &SessionConfig) -> Self {
        let (method, send_body) = if keep_verb {
            (config.effective_method(), true)
        } else if self.method == Method::HEAD {
            (Method::HEAD, false)
        } else {
            (Method::GET, false)
        };
        let referer = if config.auto_referer() {
            Some(self.url.to_string())
        } else {
            config.referer().map(str::to_string)
        };
        Self {
            url,
            number: self.number + 1,
            method,
            send_body,
            referer,
        }
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307)
}

/// Runs the whole execution. `Err` means no usable response; `Ok` may still
/// carry a soft error such as a partial body.
async fn run(
    url: Url,
    config: &SessionConfig,
    jar: &mut CookieJar,
    outcome: &mut ExecutionOutcome,
) -> Result<(ExecResult, Option<TransferError>), TransferError> {
    let client = build_client(config)?;
    let proxy = proxy_url(config)?.map(|u| u.to_string());

    let (response, attempt) = follow_chain(&client, url, config, jar, proxy.as_deref(), outcome).await?;

    let status = response.status();
    let final_url = attempt.url.to_string();
    let headers = header_pairs(response.headers());
    outcome.effective_url = Some(final_url.clone());
    outcome.status = Some(status.as_u16());
    outcome.content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    outcome.content_length_download = declared_length(response.headers());

    if config.fail_on_error() && status.as_u16() >= 400 {
        info!(status = status.as_u16(), "failing on HTTP error status");
        return Err(TransferError::HttpReturned {
            url: final_url,
            status: status.as_u16(),
        });
    }

    let head = render_head(response.version(), status, &headers);
    outcome.header_size = head.len() as u64;
    outcome.headers = headers;

    if let Some(callback) = config.header_function() {
        for line in head_lines(&head) {
            callback.write_all(line).map_err(TransferError::write)?;
        }
    }

    let expects_body = attempt.method != Method::HEAD
        && !status.is_informational()
        && status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED;
    // Decompressed bodies never match the wire length.
    let declared = if expects_body && config.encoding().is_none() {
        outcome.content_length_download
    } else {
        None
    };

    let mut sink = DownloadSink::select(
        config.write_function(),
        config.output(),
        config.return_transfer(),
        declared,
    );
    let splice_head = config.include_header() && matches!(sink, DownloadSink::Memory(_));
    if config.include_header() && !splice_head {
        sink.write_all(&head).map_err(TransferError::write)?;
    }

    let body: BodyStream = if expects_body {
        body_stream(response, &final_url, proxy.as_deref())
    } else {
        futures_util::stream::empty().boxed()
    };
    let delivery = deliver(body, declared, &mut sink).await;
    if delivery.sink_failed() {
        return Err(delivery
            .error
            .unwrap_or_else(|| TransferError::write(std::io::Error::other("sink failed"))));
    }
    outcome.size_download = delivery.received;
    outcome.partial = delivery.partial;

    let result = match sink {
        DownloadSink::Memory(buffer) => {
            let reserve = if splice_head { head.len() } else { 0 };
            let mut content = buffer.to_array(reserve);
            content[..reserve].copy_from_slice(&head[..reserve]);
            ExecResult::Content(content)
        }
        DownloadSink::Callback(_) | DownloadSink::Output(_) | DownloadSink::Stdout => {
            ExecResult::Delivered
        }
    };
    debug!(
        status = status.as_u16(),
        bytes = delivery.received,
        partial = delivery.partial,
        "transfer complete"
    );
    Ok((result, delivery.error))
}

type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransferError>> + Send>>;

fn body_stream(response: Response, url: &str, proxy: Option<&str>) -> BodyStream {
    let url = url.to_string();
    let proxy = proxy.map(str::to_string);
    response
        .bytes_stream()
        .map(move |chunk| chunk.map_err(|e| classify_transport_error(&url, proxy.as_deref(), e)))
        .boxed()
}

/// Sends attempts until a non-redirect response (or one that is not followed).
async fn follow_chain(
    client: &Client,
    url: Url,
    config: &SessionConfig,
    jar: &mut CookieJar,
    proxy: Option<&str>,
    outcome: &mut ExecutionOutcome,
) -> Result<(Response, AttemptContext), TransferError> {
    let source = config.upload_source();
    let mut attempt = AttemptContext::first(url, config);
    let mut redirects: u32 = 0;

    loop {
        let (response, uploaded) = send_attempt(client, &attempt, config, &source, jar, proxy).await?;
        outcome.size_upload = uploaded;

        let set_cookies: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        jar.store_response_cookies(&attempt.url, set_cookies);

        let status = response.status();
        if !(config.follow_location() && is_redirect(status)) {
            return Ok((response, attempt));
        }

        if let Some(max) = config.max_redirects()
            && redirects >= max
        {
            warn!(max, url = %attempt.url, "redirect limit reached");
            return Err(TransferError::TooManyRedirects {
                max: i64::from(max),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let Some(location) = location else {
            debug!(status = status.as_u16(), "redirect without Location; treating as final");
            return Ok((response, attempt));
        };

        let next = attempt
            .url
            .join(&location)
            .map_err(|_| TransferError::malformed_url(location.as_str()))?;
        redirects += 1;
        outcome.redirect_count = redirects;
        info!(
            from = %attempt.url,
            to = %next,
            status = status.as_u16(),
            hop = redirects,
            "following redirect"
        );
        attempt = attempt.follow(next, status == StatusCode::TEMPORARY_REDIRECT, config);
    }
}

/// Sends one attempt. Returns the response and the number of body bytes sent.
#[instrument(level = "debug", skip_all, fields(attempt = attempt.number, method = %attempt.method, url = %attempt.url))]
async fn send_attempt(
    client: &Client,
    attempt: &AttemptContext,
    config: &SessionConfig,
    source: &UploadSource,
    jar: &CookieJar,
    proxy: Option<&str>,
) -> Result<(Response, u64), TransferError> {
    let mut headers = user_headers(config.headers());

    if let Some(referer) = &attempt.referer
        && let Ok(value) = HeaderValue::from_str(referer)
    {
        headers.insert(REFERER, value);
    }

    let cookie = [jar.header_for(&attempt.url), config.cookie().map(str::to_string)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("; ");
    if !cookie.is_empty()
        && let Ok(value) = HeaderValue::from_str(&cookie)
    {
        headers.insert(COOKIE, value);
    }

    let body = if attempt.send_body {
        upload::prepare(source).await?
    } else {
        upload::prepare(&UploadSource::None).await?
    };
    let uploaded = body.content_length().unwrap_or(0);

    if let Some(content_type) = body.content_type()
        && let Ok(value) = HeaderValue::from_str(content_type)
    {
        headers.insert(CONTENT_TYPE, value);
    } else if matches!(source, UploadSource::Bytes(_))
        && attempt.send_body
        && !headers.contains_key(CONTENT_TYPE)
    {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
    }
    if let Some(length) = body.content_length() {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    let mut request = client
        .request(attempt.method.clone(), attempt.url.clone())
        .headers(headers);
    match config.http_version() {
        HttpVersionPref::Http10 => request = request.version(Version::HTTP_10),
        HttpVersionPref::Http11 => request = request.version(Version::HTTP_11),
        HttpVersionPref::Default => {}
    }
    if let Some((user, pass)) = config.credentials() {
        request = request.basic_auth(user, Some(pass));
    }
    if !body.is_none() {
        request = request.body(body.into_body());
    }

    debug!("sending request");
    let response = request
        .send()
        .await
        .map_err(|e| classify_transport_error(attempt.url.as_str(), proxy, e))?;
    debug!(status = response.status().as_u16(), "received response");
    Ok((response, uploaded))
}

/// Parses `Name: value` lines. `Name;` sends an empty header; lines that
/// cannot form a header are skipped.
fn user_headers(lines: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in lines {
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => match line.trim().strip_suffix(';') {
                Some(name) => (name.trim(), ""),
                None => {
                    warn!(header = %line, "ignoring header line without ':'");
                    continue;
                }
            },
        };
        if value.is_empty() && line.contains(':') {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %line, "ignoring invalid header line"),
        }
    }
    headers
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::OptionKey;

    #[test]
    fn test_redirect_statuses() {
        for code in [301, 302, 303, 307] {
            assert!(is_redirect(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [200, 304, 308, 404] {
            assert!(!is_redirect(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn test_follow_downgrades_unless_verb_kept() {
        let mut config = SessionConfig::new();
        config.set(OptionKey::PostFields, "a=1".into()).unwrap();
        let first = AttemptContext::first(Url::parse("http://h/a").unwrap(), &config);
        assert_eq!(first.method, Method::POST);

        let downgraded = first.follow(Url::parse("http://h/b").unwrap(), false, &config);
        assert_eq!(downgraded.method, Method::GET);
        assert!(!downgraded.send_body);
        assert_eq!(downgraded.number, 2);

        let kept = first.follow(Url::parse("http://h/b").unwrap(), true, &config);
        assert_eq!(kept.method, Method::POST);
        assert!(kept.send_body);

        let after_kept = downgraded.follow(Url::parse("http://h/c").unwrap(), true, &config);
        assert_eq!(after_kept.method, Method::POST);
        assert!(after_kept.send_body);
    }

    #[test]
    fn test_head_stays_head_across_redirects() {
        let mut config = SessionConfig::new();
        config.set(OptionKey::NoBody, true.into()).unwrap();
        let first = AttemptContext::first(Url::parse("http://h/a").unwrap(), &config);
        let next = first.follow(Url::parse("http://h/b").unwrap(), false, &config);
        assert_eq!(next.method, Method::HEAD);
    }

    #[test]
    fn test_auto_referer_uses_previous_url() {
        let mut config = SessionConfig::new();
        config.set(OptionKey::AutoReferer, true.into()).unwrap();
        let first = AttemptContext::first(Url::parse("http://h/a").unwrap(), &config);
        assert!(first.referer.is_none());
        let next = first.follow(Url::parse("http://h/b").unwrap(), false, &config);
        assert_eq!(next.referer.as_deref(), Some("http://h/a"));
    }

    #[test]
    fn test_user_headers_parsing() {
        let headers = user_headers(&[
            "X-One: 1".to_string(),
            "X-Empty;".to_string(),
            "X-Removed:".to_string(),
            "garbage".to_string(),
            "X-One: 2".to_string(),
        ]);
        let ones: Vec<&str> = headers
            .get_all("x-one")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(ones, vec!["1", "2"]);
        assert_eq!(headers.get("x-empty").unwrap(), "");
        assert!(headers.get("x-removed").is_none());
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_info_values() {
        let handler = HttpHandler::http();
        let outcome = ExecutionOutcome {
            effective_url: Some("http://h/".to_string()),
            status: Some(404),
            redirect_count: 2,
            ..ExecutionOutcome::default()
        };
        assert_eq!(
            handler.info(&outcome, InfoKey::EffectiveUrl),
            Some(InfoValue::Str("http://h/".to_string()))
        );
        assert_eq!(
            handler.info(&outcome, InfoKey::HttpCode),
            Some(InfoValue::Int(404))
        );
        assert_eq!(handler.info(&outcome, InfoKey::ContentType), None);
        assert_eq!(
            handler.info(&outcome, InfoKey::ContentLengthDownload),
            Some(InfoValue::Float(-1.0))
        );
    }
}
