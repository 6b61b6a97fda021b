//! Execution results and the facts recorded about them.

use serde::Serialize;

use crate::error::ErrorCode;

/// What `execute` hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecResult {
    /// No usable response; see the session's error code.
    Failed,
    /// The body went to a callback, writer or standard output.
    Delivered,
    /// The body (and head, when requested) returned in memory.
    Content(Vec<u8>),
}

impl ExecResult {
    /// True unless the execution failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    /// The in-memory content, if any.
    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Self::Content(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Queryable facts about the last execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoKey {
    /// Final URL after redirects.
    EffectiveUrl,
    /// Final HTTP status code.
    HttpCode,
    /// `Content-Type` of the final response.
    ContentType,
    /// Number of redirects followed.
    RedirectCount,
    /// Body bytes received.
    SizeDownload,
    /// Body bytes sent on the final attempt.
    SizeUpload,
    /// Declared `Content-Length` of the final response, -1 when absent.
    ContentLengthDownload,
    /// Bytes in the rendered response head.
    HeaderSize,
    /// Wall-clock seconds for the whole execution.
    TotalTime,
}

impl InfoKey {
    /// Every known key.
    pub const ALL: &'static [InfoKey] = &[
        Self::EffectiveUrl,
        Self::HttpCode,
        Self::ContentType,
        Self::RedirectCount,
        Self::SizeDownload,
        Self::SizeUpload,
        Self::ContentLengthDownload,
        Self::HeaderSize,
        Self::TotalTime,
    ];

    /// Stable numeric code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::EffectiveUrl => 0x10_0001,
            Self::HttpCode => 0x20_0002,
            Self::ContentType => 0x10_0012,
            Self::RedirectCount => 0x20_0014,
            Self::SizeDownload => 0x30_0008,
            Self::SizeUpload => 0x30_0007,
            Self::ContentLengthDownload => 0x30_000F,
            Self::HeaderSize => 0x20_000B,
            Self::TotalTime => 0x30_0003,
        }
    }

    /// Looks a key up by numeric code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|key| key.code() == code)
    }
}

/// Value returned for an [`InfoKey`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    /// Text.
    Str(String),
    /// Whole number.
    Int(i64),
    /// Fractional number.
    Float(f64),
}

/// Facts recorded by a protocol handler for one execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionOutcome {
    /// Final URL after redirects.
    pub effective_url: Option<String>,
    /// Final HTTP status.
    pub status: Option<u16>,
    /// Final response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// `Content-Type` of the final response.
    pub content_type: Option<String>,
    /// Error code the execution ended with.
    pub error: ErrorCode,
    /// Received body length disagreed with the declared length.
    pub partial: bool,
    /// Redirects followed.
    pub redirect_count: u32,
    /// Body bytes received.
    pub size_download: u64,
    /// Body bytes sent on the final attempt.
    pub size_upload: u64,
    /// Declared body length of the final response.
    pub content_length_download: Option<u64>,
    /// Bytes in the rendered response head.
    pub header_size: u64,
    /// Wall-clock seconds for the whole execution.
    pub total_time: f64,
}
