//! Session cookie jar.
//!
//! Cookies are keyed by `(domain, path, name)`; a later `Set-Cookie` for the
//! same key replaces the earlier one. Nothing is ever evicted during a
//! redirect chain, so the jar only grows while an execution runs. Expired
//! cookies stay in the jar but are never sent and never persisted.

mod netscape;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, instrument, warn};
use url::Url;

pub use netscape::{CookieError, ParseResult, parse_netscape_cookies, write_netscape_cookies};

/// A single cookie.
///
/// The value is redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    value: String,
    /// Lowercase domain without a leading dot.
    pub domain: String,
    /// Only the exact host matches (no `Domain` attribute was given).
    pub host_only: bool,
    /// Path scope.
    pub path: String,
    /// Only sent over HTTPS.
    pub secure: bool,
    /// Marked `HttpOnly`.
    pub http_only: bool,
    /// Expiry as Unix seconds; `None` for session cookies.
    pub expires: Option<u64>,
}

impl Cookie {
    /// Creates a session cookie valid for `domain` and all of its subdomains.
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            host_only: false,
            path: "/".to_string(),
            secure: false,
            http_only: false,
            expires: None,
        }
    }

    /// Returns the cookie value. Avoid logging it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True once the expiry time has passed.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    /// Parses a `Set-Cookie` header received from `url`.
    ///
    /// Returns `None` for malformed headers and for `Domain` attributes that
    /// do not cover the request host.
    #[must_use]
    pub fn parse_set_cookie(header: &str, url: &Url, now: u64) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        let mut pieces = header.split(';');
        let (name, value) = pieces.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self::new(name, value.trim(), host.clone());
        cookie.host_only = true;
        cookie.path = default_path(url);
        let mut max_age: Option<i64> = None;

        for attribute in pieces {
            let attribute = attribute.trim();
            let (key, val) = attribute
                .split_once('=')
                .map_or((attribute, ""), |(k, v)| (k.trim(), v.trim()));
            match key.to_ascii_lowercase().as_str() {
                "domain" if !val.is_empty() => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if !domain_match(&host, &domain) {
                        debug!(%domain, %host, "rejecting cookie for foreign domain");
                        return None;
                    }
                    cookie.domain = domain;
                    cookie.host_only = false;
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "expires" => {
                    if let Ok(at) = httpdate::parse_http_date(val) {
                        cookie.expires = Some(unix_seconds(at));
                    }
                }
                "max-age" => max_age = val.parse().ok(),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }

        if let Some(seconds) = max_age {
            cookie.expires = Some(match u64::try_from(seconds) {
                Ok(secs) if secs > 0 => now.saturating_add(secs),
                _ => 0,
            });
        }
        Some(cookie)
    }

    fn matches(&self, host: &str, path: &str, secure: bool, now: u64) -> bool {
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_match(host, &self.domain)
        };
        domain_ok && path_match(path, &self.path) && (secure || !self.secure) && !self.is_expired(now)
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("host_only", &self.host_only)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expires", &self.expires)
            .finish()
    }
}

/// Cookies accumulated by one session.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<(String, String, String), Cookie>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cookies, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// True when no cookie is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Iterates the stored cookies.
    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    /// First cookie named `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.iter().find(|c| c.name == name)
    }

    /// Stores a cookie, replacing any cookie with the same domain, path and name.
    pub fn insert(&mut self, cookie: Cookie) {
        let key = (cookie.domain.clone(), cookie.path.clone(), cookie.name.clone());
        self.cookies.insert(key, cookie);
    }

    /// Merges every `Set-Cookie` value received from `url`.
    ///
    /// Returns how many cookies were stored.
    pub fn store_response_cookies<'a>(
        &mut self,
        url: &Url,
        headers: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let now = now_unix();
        let mut stored = 0;
        for header in headers {
            match Cookie::parse_set_cookie(header, url, now) {
                Some(cookie) => {
                    debug!(name = %cookie.name, domain = %cookie.domain, "storing cookie");
                    self.insert(cookie);
                    stored += 1;
                }
                None => debug!(%url, "ignoring unusable Set-Cookie header"),
            }
        }
        stored
    }

    /// `Cookie` header value for a request to `url`.
    ///
    /// Longer paths come first; ties keep the jar's stable key order.
    #[must_use]
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?.to_ascii_lowercase();
        let secure = url.scheme() == "https";
        let now = now_unix();

        let mut matching: Vec<&Cookie> = self
            .iter()
            .filter(|c| c.matches(&host, url.path(), secure, now))
            .collect();
        if matching.is_empty() {
            return None;
        }
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Loads cookies from a Netscape-format file.
    ///
    /// # Errors
    ///
    /// Returns [`CookieError`] when the file cannot be read or holds no valid cookie.
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CookieError> {
        let file = File::open(path)?;
        let parsed = parse_netscape_cookies(BufReader::new(file))?;
        let count = parsed.cookies.len();
        for cookie in parsed.cookies {
            self.insert(cookie);
        }
        debug!(count, "loaded cookie file");
        Ok(count)
    }

    /// Writes the jar to `path` in Netscape format.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from creating or writing the file.
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub fn save_file(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        write_netscape_cookies(BufWriter::new(file), self.iter(), now_unix())
    }

    /// Best-effort [`save_file`](Self::save_file) that logs instead of failing.
    pub(crate) fn flush_to(&self, path: &Path) {
        if let Err(e) = self.save_file(path) {
            warn!(path = %path.display(), error = %e, "failed to write cookie jar");
        }
    }
}

/// RFC 6265 default path: the request path up to, not including, its last `/`.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

fn domain_match(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_match(request_path: &str, cookie_path: &str) -> bool {
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/')
                || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/')))
}

fn unix_seconds(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

fn now_unix() -> u64 {
    unix_seconds(SystemTime::now())
}
