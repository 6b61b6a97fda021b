//! Engine-wide defaults (timeouts, redirect limits, buffer sizes).

/// Default connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default overall transfer timeout (5 minutes for large bodies).
pub const TRANSFER_TIMEOUT_SECS: u64 = 300;

/// Default maximum number of redirects followed.
pub const DEFAULT_MAX_REDIRECTS: u32 = 50;

/// Default proxy port when the proxy address carries none.
pub const DEFAULT_PROXY_PORT: u16 = 1080;

/// Read window for streamed uploads (8 KiB).
pub const UPLOAD_WINDOW: usize = 8 * 1024;

/// Initial scatter-gather chunk size when the body length is unknown (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest declared content length trusted for the initial chunk (16 MiB).
pub const CHUNK_SIZE_CEILING: usize = 16 * 1024 * 1024;
