//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Transfer a URL with a single easy-http session.
///
/// Flags mirror the familiar curl spellings. The process exit code is the
/// session's numeric error code (0 on success).
#[derive(Parser, Debug)]
#[command(name = "easyhttp")]
#[command(author, version, about)]
pub struct Args {
    /// URL to transfer
    pub url: Option<String>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress everything but errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Custom request method
    #[arg(short = 'X', long = "request", value_name = "METHOD")]
    pub request: Option<String>,

    /// POST data; repeated values are joined with '&'
    #[arg(short = 'd', long = "data", value_name = "DATA")]
    pub data: Vec<String>,

    /// POST data, URL-encoded ("value" or "name=value")
    #[arg(long = "data-urlencode", value_name = "DATA")]
    pub data_urlencode: Vec<String>,

    /// Multipart form field ("name=value" or "name=@file[;type=mime]")
    #[arg(short = 'F', long = "form", value_name = "NAME=CONTENT")]
    pub form: Vec<String>,

    /// Extra request header
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Follow redirects
    #[arg(short = 'L', long = "location")]
    pub location: bool,

    /// Maximum redirects to follow (-1 for unlimited)
    #[arg(long = "max-redirs", value_name = "NUM", allow_hyphen_values = true)]
    pub max_redirs: Option<i64>,

    /// Write the body to a file instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Cookie string ("a=1; b=2") or cookie file to read
    #[arg(short = 'b', long = "cookie", value_name = "DATA|FILE")]
    pub cookie: Vec<String>,

    /// Write cookies to this file when done
    #[arg(short = 'c', long = "cookie-jar", value_name = "FILE")]
    pub cookie_jar: Option<PathBuf>,

    /// Include the response head in the output
    #[arg(short = 'i', long = "include")]
    pub include: bool,

    /// Fetch the head only (HEAD request)
    #[arg(short = 'I', long = "head")]
    pub head: bool,

    /// Server credentials, user:password
    #[arg(short = 'u', long = "user", value_name = "USER:PASSWORD")]
    pub user: Option<String>,

    /// Proxy address, [scheme://]host[:port]
    #[arg(short = 'x', long = "proxy", value_name = "PROXY")]
    pub proxy: Option<String>,

    /// Proxy credentials, user:password
    #[arg(short = 'U', long = "proxy-user", value_name = "USER:PASSWORD")]
    pub proxy_user: Option<String>,

    /// User-Agent header
    #[arg(short = 'A', long = "user-agent", value_name = "NAME")]
    pub user_agent: Option<String>,

    /// Referer header
    #[arg(short = 'e', long = "referer", value_name = "URL")]
    pub referer: Option<String>,

    /// Fail with exit code 22 on HTTP errors (status >= 400)
    #[arg(short = 'f', long = "fail")]
    pub fail: bool,

    /// Upload a file with PUT
    #[arg(short = 'T', long = "upload-file", value_name = "FILE")]
    pub upload_file: Option<PathBuf>,

    /// Request a compressed response and decode it
    #[arg(long)]
    pub compressed: bool,

    /// Connect timeout in seconds
    #[arg(long = "connect-timeout", value_name = "SECONDS")]
    pub connect_timeout: Option<u32>,

    /// Overall timeout in seconds
    #[arg(short = 'm', long = "max-time", value_name = "SECONDS")]
    pub max_time: Option<u32>,

    /// Client certificate (PEM)
    #[arg(short = 'E', long = "cert", value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Use HTTP/1.0
    #[arg(long = "http1.0")]
    pub http1_0: bool,

    /// Print transfer info as JSON to standard error when done
    #[arg(long = "info-json")]
    pub info_json: bool,
}

impl Args {
    /// POST body from `-d` and `--data-urlencode`, or `None` when neither was given.
    pub fn post_data(&self) -> Option<String> {
        let encoded = self.data_urlencode.iter().map(|item| match item.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                format!("{name}={}", urlencoding::encode(value))
            }
            Some((_, value)) => urlencoding::encode(value).into_owned(),
            None => urlencoding::encode(item).into_owned(),
        });
        let parts: Vec<String> = self.data.iter().cloned().chain(encoded).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("&"))
        }
    }

    /// Form fields from `-F`, split at the first '='.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.form
            .iter()
            .map(|field| match field.split_once('=') {
                Some((name, value)) => (name.to_string(), value.to_string()),
                None => (field.clone(), String::new()),
            })
            .collect()
    }
}
