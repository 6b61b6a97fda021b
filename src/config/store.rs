//! Per-session option store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use tracing::debug;

use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_REDIRECTS, DEFAULT_PROXY_PORT, TRANSFER_TIMEOUT_SECS,
};
use super::{OptionKey, OptionValue, ValueShape};
use crate::download::SinkRef;
use crate::error::OptionError;
use crate::upload::{Form, UploadSource};

const PROXY_TYPE_HTTP: i64 = 0;
const VERIFY_HOST_STRICT: i64 = 2;

/// Request mode selected by the mode-setting options; the last one set wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
    /// Plain GET (or HEAD with no-body).
    #[default]
    Get,
    /// POST with flat fields.
    Post,
    /// POST with a multipart form.
    PostForm,
    /// PUT upload.
    Put,
}

/// HTTP protocol version preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersionPref {
    /// Let the client decide.
    #[default]
    Default,
    /// HTTP/1.0.
    Http10,
    /// HTTP/1.1.
    Http11,
}

/// Option values for one session.
///
/// Setters validate and coerce; the HTTP method and body strategy are derived
/// from the stored state on demand instead of being stored redundantly.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    url: Option<String>,
    port: Option<u16>,
    kind: RequestKind,
    upload: bool,
    no_body: bool,
    custom_request: Option<String>,
    post_fields: Option<Bytes>,
    form: Option<Form>,
    infile: Option<PathBuf>,
    infile_size: Option<u64>,
    headers: Vec<String>,
    cookie: Option<String>,
    cookie_files: Vec<PathBuf>,
    cookie_jar: Option<PathBuf>,
    proxy: Option<String>,
    proxy_port: u16,
    proxy_username: Option<String>,
    proxy_password: Option<String>,
    username: Option<String>,
    password: Option<String>,
    ssl_cert: Option<PathBuf>,
    timeout: Duration,
    connect_timeout: Duration,
    follow_location: bool,
    max_redirects: Option<u32>,
    write_function: Option<SinkRef>,
    header_function: Option<SinkRef>,
    output: Option<SinkRef>,
    return_transfer: bool,
    include_header: bool,
    user_agent: Option<String>,
    referer: Option<String>,
    fail_on_error: bool,
    encoding: Option<String>,
    http_version: HttpVersionPref,
    auto_referer: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: None,
            port: None,
            kind: RequestKind::Get,
            upload: false,
            no_body: false,
            custom_request: None,
            post_fields: None,
            form: None,
            infile: None,
            infile_size: None,
            headers: Vec::new(),
            cookie: None,
            cookie_files: Vec::new(),
            cookie_jar: None,
            proxy: None,
            proxy_port: DEFAULT_PROXY_PORT,
            proxy_username: None,
            proxy_password: None,
            username: None,
            password: None,
            ssl_cert: None,
            timeout: Duration::from_secs(TRANSFER_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            follow_location: false,
            max_redirects: Some(DEFAULT_MAX_REDIRECTS),
            write_function: None,
            header_function: None,
            output: None,
            return_transfer: false,
            include_header: false,
            user_agent: None,
            referer: None,
            fail_on_error: false,
            encoding: None,
            http_version: HttpVersionPref::Default,
            auto_referer: false,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with every option at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one option, applying its side effects on related options.
    ///
    /// # Errors
    ///
    /// [`OptionError::InvalidOption`] when the value cannot be coerced to the
    /// option's shape, [`OptionError::Unsupported`] for values outside the
    /// supported subset. The configuration is left unchanged on error.
    pub fn set(&mut self, key: OptionKey, value: OptionValue) -> Result<(), OptionError> {
        debug!(option = %key, "setting option");
        match key {
            OptionKey::Url => self.url = text(key, &value)?,
            OptionKey::Port => {
                let port = int(key, &value)?;
                self.port = if port == 0 {
                    None
                } else {
                    Some(u16::try_from(port).map_err(|_| invalid(key))?)
                };
            }
            OptionKey::Post => {
                if flag(key, &value)? {
                    if self.kind != RequestKind::PostForm {
                        self.kind = RequestKind::Post;
                    }
                    self.upload = false;
                    self.no_body = false;
                } else {
                    self.kind = RequestKind::Get;
                }
            }
            OptionKey::PostFields => match value {
                OptionValue::Form(form) => self.select_form(form),
                OptionValue::Str(s) => self.select_fields(Bytes::from(s)),
                OptionValue::Bytes(b) => self.select_fields(b),
                OptionValue::Null => {
                    self.post_fields = None;
                    self.form = None;
                }
                _ => return Err(invalid(key)),
            },
            OptionKey::HttpPost => match value {
                OptionValue::Form(form) => self.select_form(form),
                _ => return Err(invalid(key)),
            },
            OptionKey::Put | OptionKey::Upload => {
                if flag(key, &value)? {
                    self.kind = RequestKind::Put;
                    self.upload = true;
                    self.no_body = false;
                } else {
                    self.kind = RequestKind::Get;
                    self.upload = false;
                }
            }
            OptionKey::HttpGet => {
                if flag(key, &value)? {
                    self.kind = RequestKind::Get;
                    self.upload = false;
                    self.no_body = false;
                }
            }
            OptionKey::NoBody => self.no_body = flag(key, &value)?,
            OptionKey::CustomRequest => {
                let method = text(key, &value)?.filter(|m| !m.is_empty());
                if let Some(m) = &method {
                    Method::from_bytes(m.as_bytes()).map_err(|_| invalid(key))?;
                }
                self.custom_request = method;
            }
            OptionKey::InFile => {
                self.infile = value.as_path().ok_or_else(|| invalid(key))?;
            }
            OptionKey::InFileSize | OptionKey::InFileSizeLarge => {
                let size = int(key, &value)?;
                self.infile_size = u64::try_from(size).ok();
            }
            OptionKey::HttpHeader => self.headers = value.as_list().ok_or_else(|| invalid(key))?,
            OptionKey::Cookie => self.cookie = text(key, &value)?.filter(|c| !c.is_empty()),
            OptionKey::CookieFile => {
                if let Some(path) = text(key, &value)?.filter(|p| !p.is_empty()) {
                    self.cookie_files.push(PathBuf::from(path));
                }
            }
            OptionKey::CookieJar => {
                self.cookie_jar = text(key, &value)?.filter(|p| !p.is_empty()).map(PathBuf::from);
            }
            OptionKey::Proxy => self.proxy = text(key, &value)?,
            OptionKey::ProxyPort => {
                let port = int(key, &value)?;
                self.proxy_port = u16::try_from(port).map_err(|_| invalid(key))?;
            }
            OptionKey::ProxyType => {
                if int(key, &value)? != PROXY_TYPE_HTTP {
                    return Err(OptionError::unsupported(key, "only HTTP proxies are supported"));
                }
            }
            OptionKey::ProxyUserPwd => {
                let (user, pass) = split_credentials(text(key, &value)?);
                self.proxy_username = user;
                self.proxy_password = pass;
            }
            OptionKey::ProxyUsername => self.proxy_username = text(key, &value)?,
            OptionKey::ProxyPassword => self.proxy_password = text(key, &value)?,
            OptionKey::UserPwd => {
                let (user, pass) = split_credentials(text(key, &value)?);
                self.username = user;
                self.password = pass;
            }
            OptionKey::Username => self.username = text(key, &value)?,
            OptionKey::Password => self.password = text(key, &value)?,
            OptionKey::SslCert => self.ssl_cert = value.as_path().ok_or_else(|| invalid(key))?,
            OptionKey::SslCertPasswd => {
                if text(key, &value)?.is_some_and(|password| !password.is_empty()) {
                    return Err(OptionError::unsupported(
                        key,
                        "encrypted client keys are not supported; use an unencrypted PEM",
                    ));
                }
            }
            OptionKey::SslVerifyPeer => {
                if !flag(key, &value)? {
                    return Err(OptionError::unsupported(
                        key,
                        "peer verification cannot be disabled",
                    ));
                }
            }
            OptionKey::SslVerifyHost => {
                if int(key, &value)? != VERIFY_HOST_STRICT {
                    return Err(OptionError::unsupported(
                        key,
                        "only strict host verification (2) is supported",
                    ));
                }
            }
            OptionKey::Timeout => {
                self.timeout = seconds(key, &value, TRANSFER_TIMEOUT_SECS)?;
            }
            OptionKey::ConnectTimeout => {
                self.connect_timeout = seconds(key, &value, CONNECT_TIMEOUT_SECS)?;
            }
            OptionKey::FollowLocation => self.follow_location = flag(key, &value)?,
            OptionKey::MaxRedirs => {
                let max = int(key, &value)?;
                if max < -1 {
                    return Err(invalid(key));
                }
                self.max_redirects = u32::try_from(max).ok();
                if max > 1 {
                    self.follow_location = true;
                }
            }
            OptionKey::WriteFunction => self.write_function = sink(key, value)?,
            OptionKey::HeaderFunction => self.header_function = sink(key, value)?,
            OptionKey::File => self.output = sink(key, value)?,
            OptionKey::ReturnTransfer => self.return_transfer = flag(key, &value)?,
            OptionKey::Header => self.include_header = flag(key, &value)?,
            OptionKey::UserAgent => self.user_agent = text(key, &value)?,
            OptionKey::Referer => self.referer = text(key, &value)?.filter(|r| !r.is_empty()),
            OptionKey::FailOnError => self.fail_on_error = flag(key, &value)?,
            OptionKey::Encoding => self.encoding = text(key, &value)?,
            OptionKey::HttpVersion => {
                self.http_version = match int(key, &value)? {
                    0 => HttpVersionPref::Default,
                    1 => HttpVersionPref::Http10,
                    2 => HttpVersionPref::Http11,
                    _ => {
                        return Err(OptionError::unsupported(
                            key,
                            "only HTTP/1.0 and HTTP/1.1 can be requested",
                        ));
                    }
                };
            }
            OptionKey::AutoReferer => self.auto_referer = flag(key, &value)?,
            OptionKey::BinaryTransfer => {
                flag(key, &value)?;
            }
        }
        Ok(())
    }

    fn select_fields(&mut self, fields: Bytes) {
        self.post_fields = Some(fields);
        self.kind = RequestKind::Post;
        self.upload = false;
        self.no_body = false;
    }

    fn select_form(&mut self, form: Form) {
        self.form = Some(form);
        self.kind = RequestKind::PostForm;
        self.upload = false;
        self.no_body = false;
    }

    /// Method sent on the first attempt.
    ///
    /// Custom method, else PUT when uploading, else POST in a post mode, else
    /// HEAD when no body is wanted, else GET.
    #[must_use]
    pub fn effective_method(&self) -> Method {
        if let Some(custom) = &self.custom_request
            && let Ok(method) = Method::from_bytes(custom.as_bytes())
        {
            return method;
        }
        if self.upload {
            return Method::PUT;
        }
        match self.kind {
            RequestKind::Post | RequestKind::PostForm => Method::POST,
            RequestKind::Get | RequestKind::Put if self.no_body => Method::HEAD,
            RequestKind::Get | RequestKind::Put => Method::GET,
        }
    }

    /// Body strategy implied by the current request mode.
    #[must_use]
    pub fn upload_source(&self) -> UploadSource {
        if self.upload {
            return match &self.infile {
                Some(path) => UploadSource::File {
                    path: path.clone(),
                    declared_size: self.infile_size,
                },
                None => UploadSource::None,
            };
        }
        match self.kind {
            RequestKind::PostForm => self
                .form
                .clone()
                .map_or(UploadSource::None, UploadSource::Multipart),
            RequestKind::Post => {
                UploadSource::Bytes(self.post_fields.clone().unwrap_or_default())
            }
            RequestKind::Get | RequestKind::Put => UploadSource::None,
        }
    }

    /// Takes the cookie files waiting to be loaded, leaving the list empty.
    pub(crate) fn take_cookie_files(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.cookie_files)
    }

    /// Target URL as configured.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Port override.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Request mode.
    #[must_use]
    pub fn request_kind(&self) -> RequestKind {
        self.kind
    }

    /// Extra request header lines.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Literal cookie string appended to the `Cookie` header.
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Cookie files still waiting to be loaded.
    #[must_use]
    pub fn cookie_files(&self) -> &[PathBuf] {
        &self.cookie_files
    }

    /// Path the cookie jar is written to on close.
    #[must_use]
    pub fn cookie_jar(&self) -> Option<&Path> {
        self.cookie_jar.as_deref()
    }

    /// Proxy address; `Some("")` disables environment proxies.
    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Proxy port used when the address carries none.
    #[must_use]
    pub fn proxy_port(&self) -> u16 {
        self.proxy_port
    }

    /// Proxy credentials.
    #[must_use]
    pub fn proxy_credentials(&self) -> Option<(&str, &str)> {
        credentials(self.proxy_username.as_deref(), self.proxy_password.as_deref())
    }

    /// Server credentials.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        credentials(self.username.as_deref(), self.password.as_deref())
    }

    /// Client certificate path.
    #[must_use]
    pub fn ssl_cert(&self) -> Option<&Path> {
        self.ssl_cert.as_deref()
    }

    /// Overall transfer timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Whether redirects are followed.
    #[must_use]
    pub fn follow_location(&self) -> bool {
        self.follow_location
    }

    /// Redirect limit; `None` is unlimited.
    #[must_use]
    pub fn max_redirects(&self) -> Option<u32> {
        self.max_redirects
    }

    /// Body callback.
    #[must_use]
    pub fn write_function(&self) -> Option<&SinkRef> {
        self.write_function.as_ref()
    }

    /// Header-line callback.
    #[must_use]
    pub fn header_function(&self) -> Option<&SinkRef> {
        self.header_function.as_ref()
    }

    /// Output writer.
    #[must_use]
    pub fn output(&self) -> Option<&SinkRef> {
        self.output.as_ref()
    }

    /// Whether the body is returned from `execute`.
    #[must_use]
    pub fn return_transfer(&self) -> bool {
        self.return_transfer
    }

    /// Whether the response head is included in the output.
    #[must_use]
    pub fn include_header(&self) -> bool {
        self.include_header
    }

    /// Configured `User-Agent`.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Configured `Referer`.
    #[must_use]
    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref()
    }

    /// Whether status >= 400 fails the execution.
    #[must_use]
    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    /// Accepted encodings; decompression is enabled when set.
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// HTTP version preference.
    #[must_use]
    pub fn http_version(&self) -> HttpVersionPref {
        self.http_version
    }

    /// Whether redirects carry the previous URL as `Referer`.
    #[must_use]
    pub fn auto_referer(&self) -> bool {
        self.auto_referer
    }
}

fn invalid(key: OptionKey) -> OptionError {
    OptionError::invalid(key, key.shape())
}

fn flag(key: OptionKey, value: &OptionValue) -> Result<bool, OptionError> {
    value.as_bool().ok_or_else(|| invalid(key))
}

fn int(key: OptionKey, value: &OptionValue) -> Result<i64, OptionError> {
    value.as_int().ok_or_else(|| invalid(key))
}

fn text(key: OptionKey, value: &OptionValue) -> Result<Option<String>, OptionError> {
    value.as_text().ok_or_else(|| invalid(key))
}

fn sink(key: OptionKey, value: OptionValue) -> Result<Option<SinkRef>, OptionError> {
    match value {
        OptionValue::Sink(sink) => Ok(Some(sink)),
        OptionValue::Null => Ok(None),
        _ => Err(OptionError::invalid(key, ValueShape::Sink)),
    }
}

/// Zero restores the default; negative values are rejected.
fn seconds(key: OptionKey, value: &OptionValue, default: u64) -> Result<Duration, OptionError> {
    let secs = u64::try_from(int(key, value)?).map_err(|_| invalid(key))?;
    Ok(Duration::from_secs(if secs == 0 { default } else { secs }))
}

/// Splits `user:password` at the first colon.
fn split_credentials(value: Option<String>) -> (Option<String>, Option<String>) {
    match value {
        Some(pair) => match pair.split_once(':') {
            Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
            None => (Some(pair), None),
        },
        None => (None, None),
    }
}

fn credentials<'a>(user: Option<&'a str>, pass: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    user.filter(|u| !u.is_empty())
        .map(|u| (u, pass.unwrap_or("")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    fn config_with(options: &[(OptionKey, OptionValue)]) -> SessionConfig {
        let mut config = SessionConfig::new();
        for (key, value) in options {
            config.set(*key, value.clone()).unwrap();
        }
        config
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new();
        assert_eq!(config.effective_method(), Method::GET);
        assert_eq!(config.max_redirects(), Some(50));
        assert_eq!(config.proxy_port(), 1080);
        assert!(!config.follow_location());
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_post_fields_force_post() {
        let config = config_with(&[(OptionKey::PostFields, "a=1&b=2".into())]);
        assert_eq!(config.effective_method(), Method::POST);
        match config.upload_source() {
            UploadSource::Bytes(body) => assert_eq!(&body[..], b"a=1&b=2"),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_post_fields_with_form_selects_multipart() {
        let form = Form::new().text("name", "value");
        let config = config_with(&[(OptionKey::PostFields, form.into())]);
        assert_eq!(config.request_kind(), RequestKind::PostForm);
        assert!(matches!(config.upload_source(), UploadSource::Multipart(_)));
    }

    #[test]
    fn test_last_mode_setting_option_wins() {
        let config = config_with(&[
            (OptionKey::PostFields, "x=1".into()),
            (OptionKey::HttpGet, true.into()),
        ]);
        assert_eq!(config.effective_method(), Method::GET);
        assert!(matches!(config.upload_source(), UploadSource::None));
    }

    #[test]
    fn test_post_true_keeps_form_mode() {
        let form = Form::new().text("k", "v");
        let config = config_with(&[
            (OptionKey::HttpPost, form.into()),
            (OptionKey::Post, true.into()),
        ]);
        assert_eq!(config.request_kind(), RequestKind::PostForm);
    }

    #[test]
    fn test_upload_selects_put_with_file() {
        let config = config_with(&[
            (OptionKey::Upload, true.into()),
            (OptionKey::InFile, PathBuf::from("/tmp/data.bin").into()),
            (OptionKey::InFileSize, 12.into()),
        ]);
        assert_eq!(config.effective_method(), Method::PUT);
        match config.upload_source() {
            UploadSource::File {
                path,
                declared_size,
            } => {
                assert_eq!(path, PathBuf::from("/tmp/data.bin"));
                assert_eq!(declared_size, Some(12));
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_method_precedence() {
        let config = config_with(&[
            (OptionKey::Upload, true.into()),
            (OptionKey::CustomRequest, "PATCH".into()),
        ]);
        assert_eq!(config.effective_method().as_str(), "PATCH");

        let config = config_with(&[(OptionKey::NoBody, true.into())]);
        assert_eq!(config.effective_method(), Method::HEAD);

        let config = config_with(&[
            (OptionKey::NoBody, true.into()),
            (OptionKey::Post, true.into()),
        ]);
        assert_eq!(config.effective_method(), Method::POST);
    }

    #[test]
    fn test_invalid_custom_method_rejected() {
        let mut config = SessionConfig::new();
        let err = config
            .set(OptionKey::CustomRequest, "BAD METHOD".into())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadFunctionArgument);
    }

    #[test]
    fn test_max_redirs_enables_follow() {
        let config = config_with(&[(OptionKey::MaxRedirs, 5.into())]);
        assert!(config.follow_location());
        assert_eq!(config.max_redirects(), Some(5));

        let config = config_with(&[(OptionKey::MaxRedirs, 1.into())]);
        assert!(!config.follow_location());

        let config = config_with(&[(OptionKey::MaxRedirs, (-1).into())]);
        assert_eq!(config.max_redirects(), None);
    }

    #[test]
    fn test_userpwd_split_at_first_colon() {
        let config = config_with(&[(OptionKey::UserPwd, "alice:se:cret".into())]);
        assert_eq!(config.credentials(), Some(("alice", "se:cret")));

        let config = config_with(&[(OptionKey::UserPwd, "bob".into())]);
        assert_eq!(config.credentials(), Some(("bob", "")));
    }

    #[test]
    fn test_cookie_files_accumulate() {
        let mut config = config_with(&[
            (OptionKey::CookieFile, "a.txt".into()),
            (OptionKey::CookieFile, "b.txt".into()),
        ]);
        assert_eq!(config.cookie_files().len(), 2);
        let taken = config.take_cookie_files();
        assert_eq!(taken.len(), 2);
        assert!(config.cookie_files().is_empty());
    }

    #[test]
    fn test_unsupported_values() {
        let mut config = SessionConfig::new();
        for (key, value) in [
            (OptionKey::ProxyType, OptionValue::from(5)),
            (OptionKey::SslVerifyPeer, OptionValue::from(false)),
            (OptionKey::SslVerifyHost, OptionValue::from(1)),
            (OptionKey::HttpVersion, OptionValue::from(3)),
            (OptionKey::SslCertPasswd, OptionValue::from("hunter2")),
        ] {
            let err = config.set(key, value).unwrap_err();
            assert_eq!(err.code(), ErrorCode::UnknownOption, "{key}");
        }
        config.set(OptionKey::ProxyType, 0.into()).unwrap();
        config.set(OptionKey::SslVerifyPeer, true.into()).unwrap();
        config.set(OptionKey::SslVerifyHost, 2.into()).unwrap();
        config.set(OptionKey::SslCertPasswd, "".into()).unwrap();
    }

    #[test]
    fn test_shape_mismatch_rejected_without_change() {
        let mut config = SessionConfig::new();
        let err = config
            .set(OptionKey::Timeout, OptionValue::from("soon"))
            .unwrap_err();
        assert_eq!(
            err,
            OptionError::invalid(OptionKey::Timeout, ValueShape::Integer)
        );
        assert_eq!(config.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_timeouts_in_seconds() {
        let config = config_with(&[
            (OptionKey::Timeout, 5.into()),
            (OptionKey::ConnectTimeout, "2".into()),
        ]);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_sink_shape_required() {
        let mut config = SessionConfig::new();
        let err = config.set(OptionKey::File, "out.txt".into()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadFunctionArgument);
    }
}
