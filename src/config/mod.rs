//! Session configuration: the option registry and the per-session store.
//!
//! Every option is identified by an [`OptionKey`] that carries its stable
//! numeric code and the [`ValueShape`] it accepts. Values arrive as a loosely
//! typed [`OptionValue`] and are coerced to the option's shape when stored.
//!
//! # Coercion rules
//!
//! | Shape | Accepted values |
//! |-------|-----------------|
//! | `Boolean` | `Bool`, `Int` (non-zero is true), `Str` (`""`/`"0"` is false) |
//! | `Integer` | `Int`, `Bool`, numeric `Str` |
//! | `String` | `Str`, `Int`, UTF-8 `Bytes`, `Path`, `Null` clears |
//! | `StringList` | `List`, `Str` (single item), `Null` clears |
//! | `Body` | `Str`/`Bytes` (raw fields) or `Form` (multipart) |
//! | `Form` | `Form` |
//! | `Path` | `Path`, `Str` |
//! | `Sink` | `Sink`, `Null` clears |

mod constants;
mod store;

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;

pub use constants::{
    CHUNK_SIZE_CEILING, CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_REDIRECTS,
    DEFAULT_PROXY_PORT, TRANSFER_TIMEOUT_SECS, UPLOAD_WINDOW,
};
pub use store::{HttpVersionPref, RequestKind, SessionConfig};

use crate::download::SinkRef;
use crate::error::OptionError;
use crate::upload::Form;

/// The kind of value an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// Truthy flag.
    Boolean,
    /// Whole number.
    Integer,
    /// Text.
    String,
    /// Ordered list of text items.
    StringList,
    /// Request body: flat fields or a multipart form.
    Body,
    /// Multipart form.
    Form,
    /// Filesystem path.
    Path,
    /// Byte sink (writer or callback).
    Sink,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::String => "string",
            Self::StringList => "string list",
            Self::Body => "string, bytes or form",
            Self::Form => "form",
            Self::Path => "path",
            Self::Sink => "sink",
        };
        f.write_str(name)
    }
}

macro_rules! option_keys {
    ($( $(#[$doc:meta])* $variant:ident = $code:expr, $name:literal, $shape:ident; )*) => {
        /// Identifies a configuration option.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OptionKey {
            $( $(#[$doc])* $variant, )*
        }

        impl OptionKey {
            /// Every known option, in declaration order.
            pub const ALL: &'static [OptionKey] = &[ $( OptionKey::$variant, )* ];

            /// Stable numeric code.
            #[must_use]
            pub fn code(self) -> i64 {
                match self { $( Self::$variant => $code, )* }
            }

            /// Conventional constant name, e.g. `CURLOPT_URL`.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self { $( Self::$variant => $name, )* }
            }

            /// Shape of value this option accepts.
            #[must_use]
            pub fn shape(self) -> ValueShape {
                match self { $( Self::$variant => ValueShape::$shape, )* }
            }
        }
    };
}

option_keys! {
    /// Target URL.
    Url = 10002, "CURLOPT_URL", String;
    /// Port overriding the URL's port.
    Port = 3, "CURLOPT_PORT", Integer;
    /// Send a POST request.
    Post = 47, "CURLOPT_POST", Boolean;
    /// POST body: raw fields or a form.
    PostFields = 10015, "CURLOPT_POSTFIELDS", Body;
    /// Multipart POST form.
    HttpPost = 10024, "CURLOPT_HTTPPOST", Form;
    /// Upload with PUT.
    Put = 54, "CURLOPT_PUT", Boolean;
    /// Upload with PUT.
    Upload = 46, "CURLOPT_UPLOAD", Boolean;
    /// Reset to a plain GET.
    HttpGet = 80, "CURLOPT_HTTPGET", Boolean;
    /// Do not fetch the body (HEAD).
    NoBody = 44, "CURLOPT_NOBODY", Boolean;
    /// Custom request method.
    CustomRequest = 10036, "CURLOPT_CUSTOMREQUEST", String;
    /// File streamed as the upload body.
    InFile = 10009, "CURLOPT_INFILE", Path;
    /// Declared upload size.
    InFileSize = 14, "CURLOPT_INFILESIZE", Integer;
    /// Declared upload size.
    InFileSizeLarge = 30115, "CURLOPT_INFILESIZE_LARGE", Integer;
    /// Extra request headers, `Name: value`.
    HttpHeader = 10023, "CURLOPT_HTTPHEADER", StringList;
    /// Literal `Cookie` header contents.
    Cookie = 10022, "CURLOPT_COOKIE", String;
    /// Cookie file to load before the first request.
    CookieFile = 10031, "CURLOPT_COOKIEFILE", String;
    /// Cookie file written when the session closes.
    CookieJar = 10082, "CURLOPT_COOKIEJAR", String;
    /// Proxy address.
    Proxy = 10004, "CURLOPT_PROXY", String;
    /// Proxy port.
    ProxyPort = 59, "CURLOPT_PROXYPORT", Integer;
    /// Proxy protocol.
    ProxyType = 101, "CURLOPT_PROXYTYPE", Integer;
    /// Proxy credentials, `user:password`.
    ProxyUserPwd = 10006, "CURLOPT_PROXYUSERPWD", String;
    /// Proxy user name.
    ProxyUsername = 10175, "CURLOPT_PROXYUSERNAME", String;
    /// Proxy password.
    ProxyPassword = 10176, "CURLOPT_PROXYPASSWORD", String;
    /// Credentials, `user:password`.
    UserPwd = 10005, "CURLOPT_USERPWD", String;
    /// User name.
    Username = 10173, "CURLOPT_USERNAME", String;
    /// Password.
    Password = 10174, "CURLOPT_PASSWORD", String;
    /// Client certificate (PEM).
    SslCert = 10025, "CURLOPT_SSLCERT", Path;
    /// Client certificate password.
    SslCertPasswd = 10026, "CURLOPT_SSLCERTPASSWD", String;
    /// Verify the peer certificate.
    SslVerifyPeer = 64, "CURLOPT_SSL_VERIFYPEER", Boolean;
    /// Verify the peer host name.
    SslVerifyHost = 81, "CURLOPT_SSL_VERIFYHOST", Integer;
    /// Overall timeout, seconds.
    Timeout = 13, "CURLOPT_TIMEOUT", Integer;
    /// Connect timeout, seconds.
    ConnectTimeout = 78, "CURLOPT_CONNECTTIMEOUT", Integer;
    /// Follow redirects.
    FollowLocation = 52, "CURLOPT_FOLLOWLOCATION", Boolean;
    /// Maximum redirects, -1 for unlimited.
    MaxRedirs = 68, "CURLOPT_MAXREDIRS", Integer;
    /// Callback receiving body bytes.
    WriteFunction = 20011, "CURLOPT_WRITEFUNCTION", Sink;
    /// Callback receiving header lines.
    HeaderFunction = 20079, "CURLOPT_HEADERFUNCTION", Sink;
    /// Writer receiving body bytes.
    File = 10001, "CURLOPT_FILE", Sink;
    /// Return the body from `execute`.
    ReturnTransfer = 19913, "CURLOPT_RETURNTRANSFER", Boolean;
    /// Include the response head in the output.
    Header = 42, "CURLOPT_HEADER", Boolean;
    /// `User-Agent` header.
    UserAgent = 10018, "CURLOPT_USERAGENT", String;
    /// `Referer` header.
    Referer = 10016, "CURLOPT_REFERER", String;
    /// Fail on HTTP status >= 400.
    FailOnError = 45, "CURLOPT_FAILONERROR", Boolean;
    /// Accepted content encodings; enables decompression.
    Encoding = 10102, "CURLOPT_ENCODING", String;
    /// HTTP version: 0 default, 1 for 1.0, 2 for 1.1.
    HttpVersion = 84, "CURLOPT_HTTP_VERSION", Integer;
    /// Send the previous URL as `Referer` when following redirects.
    AutoReferer = 58, "CURLOPT_AUTOREFERER", Boolean;
    /// Accepted for compatibility; has no effect.
    BinaryTransfer = 19914, "CURLOPT_BINARYTRANSFER", Boolean;
}

impl OptionKey {
    /// Looks an option up by its numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`OptionError::Unsupported`] for unknown codes.
    pub fn from_code(code: i64) -> Result<Self, OptionError> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.code() == code)
            .ok_or_else(|| OptionError::unsupported(code, "unknown option code"))
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A loosely typed option value, coerced to the option's shape when set.
#[derive(Debug, Clone)]
pub enum OptionValue {
    /// Absent value; clears string, list and sink options.
    Null,
    /// Flag.
    Bool(bool),
    /// Number.
    Int(i64),
    /// Text.
    Str(String),
    /// Raw bytes.
    Bytes(Bytes),
    /// List of text items.
    List(Vec<String>),
    /// Multipart form.
    Form(Form),
    /// Filesystem path.
    Path(PathBuf),
    /// Byte sink.
    Sink(SinkRef),
}

impl OptionValue {
    pub(crate) fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(n) => Some(*n != 0),
            Self::Str(s) => Some(!(s.is_empty() || s == "0")),
            Self::Null => Some(false),
            _ => None,
        }
    }

    pub(crate) fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `Some(None)` means the value clears the option.
    pub(crate) fn as_text(&self) -> Option<Option<String>> {
        match self {
            Self::Null => Some(None),
            Self::Str(s) => Some(Some(s.clone())),
            Self::Int(n) => Some(Some(n.to_string())),
            Self::Bytes(b) => std::str::from_utf8(b).ok().map(|s| Some(s.to_string())),
            Self::Path(p) => Some(Some(p.to_string_lossy().into_owned())),
            _ => None,
        }
    }

    pub(crate) fn as_list(&self) -> Option<Vec<String>> {
        match self {
            Self::Null => Some(Vec::new()),
            Self::List(items) => Some(items.clone()),
            Self::Str(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }

    pub(crate) fn as_path(&self) -> Option<Option<PathBuf>> {
        match self {
            Self::Null => Some(None),
            Self::Path(p) => Some(Some(p.clone())),
            Self::Str(s) if !s.is_empty() => Some(Some(PathBuf::from(s))),
            Self::Str(_) => Some(None),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u16> for OptionValue {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<u8>> for OptionValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for OptionValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<Bytes> for OptionValue {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Form> for OptionValue {
    fn from(value: Form) -> Self {
        Self::Form(value)
    }
}

impl From<PathBuf> for OptionValue {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&std::path::Path> for OptionValue {
    fn from(value: &std::path::Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<SinkRef> for OptionValue {
    fn from(value: SinkRef) -> Self {
        Self::Sink(value)
    }
}

impl<T> From<Option<T>> for OptionValue
where
    T: Into<OptionValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_option_codes_round_trip_through_lookup() {
        for key in OptionKey::ALL {
            assert_eq!(OptionKey::from_code(key.code()).unwrap(), *key);
        }
    }

    #[test]
    fn test_option_codes_are_unique() {
        let mut codes: Vec<i64> = OptionKey::ALL.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        let before = codes.len();
        codes.dedup();
        assert_eq!(before, codes.len());
    }

    #[test]
    fn test_unknown_code_is_unsupported() {
        let err = OptionKey::from_code(99_999).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::UnknownOption);
    }

    #[test]
    fn test_well_known_codes() {
        assert_eq!(OptionKey::Url.code(), 10002);
        assert_eq!(OptionKey::FollowLocation.code(), 52);
        assert_eq!(OptionKey::MaxRedirs.code(), 68);
        assert_eq!(OptionKey::ReturnTransfer.code(), 19913);
        assert_eq!(OptionKey::Url.name(), "CURLOPT_URL");
        assert_eq!(OptionKey::Timeout.shape(), ValueShape::Integer);
    }

    #[test]
    fn test_truthy_coercion() {
        assert_eq!(OptionValue::from("1").as_bool(), Some(true));
        assert_eq!(OptionValue::from("0").as_bool(), Some(false));
        assert_eq!(OptionValue::from("").as_bool(), Some(false));
        assert_eq!(OptionValue::from(2).as_bool(), Some(true));
        assert_eq!(OptionValue::List(vec![]).as_bool(), None);
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(OptionValue::from(" 42 ").as_int(), Some(42));
        assert_eq!(OptionValue::from(true).as_int(), Some(1));
        assert_eq!(OptionValue::from("abc").as_int(), None);
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(
            OptionValue::from(8080).as_text(),
            Some(Some("8080".to_string()))
        );
        assert_eq!(OptionValue::Null.as_text(), Some(None));
        assert_eq!(OptionValue::from(true).as_text(), None);
    }
}
