//! Netscape cookie file format (7 TAB-separated fields per line).
//!
//! `domain  tailmatch  path  secure  expires  name  value`
//!
//! Lines prefixed with `#HttpOnly_` carry HTTP-only cookies; every other line
//! starting with `#` is a comment.

use std::io::{BufRead, Write};

use tracing::{debug, instrument, warn};

use super::Cookie;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Errors that can occur while reading a cookie file.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// A line in the cookie file has an invalid format.
    #[error("line {line_number}: {reason} (got: {content})")]
    InvalidLine {
        /// 1-based line number in the cookie file.
        line_number: usize,
        /// The offending line content, value redacted.
        content: String,
        /// Description of what was wrong.
        reason: String,
    },

    /// I/O error reading the cookie file.
    #[error("failed to read cookie file: {0}")]
    Io(#[from] std::io::Error),

    /// No valid cookies found in a non-empty file.
    #[error("no valid cookies found in file ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Number of malformed lines encountered.
        malformed_count: usize,
    },
}

/// Cookies parsed from a file plus warnings for skipped lines.
#[derive(Debug)]
pub struct ParseResult {
    /// Successfully parsed cookies.
    pub cookies: Vec<Cookie>,
    /// Warnings for malformed lines (line number and reason).
    pub warnings: Vec<(usize, String)>,
}

/// Parses a Netscape-format cookie file.
///
/// Malformed lines are collected as warnings (partial success).
///
/// # Errors
///
/// Returns [`CookieError::Io`] on read failure, or
/// [`CookieError::NoCookiesFound`] when a non-empty file yields zero valid cookies.
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<ParseResult, CookieError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut non_blank_lines = 0;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result?;
        let line = line.trim_end();

        if line.is_empty() {
            continue;
        }

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        non_blank_lines += 1;

        match parse_cookie_line(line, line_number, http_only) {
            Ok(cookie) => {
                debug!(line = line_number, domain = %cookie.domain, name = %cookie.name, "parsed cookie");
                cookies.push(cookie);
            }
            Err(e) => {
                warn!(line = line_number, reason = %e, "skipping malformed cookie line");
                warnings.push((line_number, e.to_string()));
            }
        }
    }

    if cookies.is_empty() && non_blank_lines > 0 {
        return Err(CookieError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    Ok(ParseResult { cookies, warnings })
}

fn parse_cookie_line(line: &str, line_number: usize, http_only: bool) -> Result<Cookie, CookieError> {
    let invalid = |reason: String| CookieError::InvalidLine {
        line_number,
        content: redact_line_for_error(line),
        reason,
    };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return Err(invalid(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        )));
    }

    let raw_domain = fields[0];
    let tailmatch = parse_bool_field(fields[1], "tailmatch").map_err(&invalid)?;
    let path = fields[2];
    let secure = parse_bool_field(fields[3], "secure").map_err(&invalid)?;
    let expires = fields[4].parse::<u64>().map_err(|_| {
        invalid(format!(
            "expires field must be a non-negative integer, got '{}'",
            fields[4]
        ))
    })?;
    let name = fields[5];
    let value = fields[6];

    let domain = raw_domain.trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err(invalid("domain field is empty".to_string()));
    }
    if name.is_empty() {
        return Err(invalid("cookie name field is empty".to_string()));
    }

    let mut cookie = Cookie::new(name, value, domain);
    cookie.host_only = !tailmatch && !raw_domain.starts_with('.');
    cookie.path = if path.starts_with('/') { path.to_string() } else { "/".to_string() };
    cookie.secure = secure;
    cookie.http_only = http_only;
    cookie.expires = (expires > 0).then_some(expires);
    Ok(cookie)
}

fn parse_bool_field(value: &str, field_name: &str) -> Result<bool, String> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(format!(
            "{field_name} field must be TRUE or FALSE, got '{value}'"
        )),
    }
}

/// Redacts the cookie value (7th field) for safe error messages.
fn redact_line_for_error(line: &str) -> String {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() >= 7 {
        let mut redacted = fields[..6].join("\t");
        redacted.push_str("\t[REDACTED]");
        redacted
    } else {
        line.to_string()
    }
}

/// Writes cookies in Netscape format. Expired cookies are skipped.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_netscape_cookies<'a>(
    mut writer: impl Write,
    cookies: impl IntoIterator<Item = &'a Cookie>,
    now: u64,
) -> std::io::Result<()> {
    writeln!(writer, "# Netscape HTTP Cookie File")?;
    writeln!(writer, "# This file was generated by easy-http. Edit at your own risk.")?;
    writeln!(writer)?;
    for cookie in cookies.into_iter().filter(|c| !c.is_expired(now)) {
        let prefix = if cookie.http_only { HTTP_ONLY_PREFIX } else { "" };
        let (domain, tailmatch) = if cookie.host_only {
            (cookie.domain.clone(), "FALSE")
        } else {
            (format!(".{}", cookie.domain), "TRUE")
        };
        writeln!(
            writer,
            "{prefix}{domain}\t{tailmatch}\t{}\t{}\t{}\t{}\t{}",
            cookie.path,
            if cookie.secure { "TRUE" } else { "FALSE" },
            cookie.expires.unwrap_or(0),
            cookie.name,
            cookie.value(),
        )?;
    }
    writer.flush()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn cursor(s: &str) -> Cursor<&[u8]> {
        Cursor::new(s.as_bytes())
    }

    #[test]
    fn test_parse_valid_file() {
        let input = "\
# Netscape HTTP Cookie File
.example.com\tTRUE\t/\tFALSE\t0\tsession\tabc123
other.com\tFALSE\t/path\tTRUE\t1700000000\ttoken\txyz789
";
        let result = parse_netscape_cookies(cursor(input)).unwrap();
        assert_eq!(result.cookies.len(), 2);
        assert!(result.warnings.is_empty());

        let first = &result.cookies[0];
        assert_eq!(first.domain, "example.com");
        assert!(!first.host_only);
        assert_eq!(first.expires, None);
        assert_eq!(first.value(), "abc123");

        let second = &result.cookies[1];
        assert!(second.host_only);
        assert!(second.secure);
        assert_eq!(second.path, "/path");
        assert_eq!(second.expires, Some(1_700_000_000));
    }

    #[test]
    fn test_http_only_prefix_is_not_a_comment() {
        let input = "#HttpOnly_.example.com\tTRUE\t/\tFALSE\t0\tsid\t1\n# plain comment\n";
        let result = parse_netscape_cookies(cursor(input)).unwrap();
        assert_eq!(result.cookies.len(), 1);
        assert!(result.cookies[0].http_only);
    }

    #[test]
    fn test_malformed_lines_become_warnings() {
        let input = "\
.example.com\tTRUE\t/\tFALSE\t0\tgood\tvalue
.example.com\tMAYBE\t/\tFALSE\t0\tbad\tsecret
";
        let result = parse_netscape_cookies(cursor(input)).unwrap();
        assert_eq!(result.cookies.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(!result.warnings[0].1.contains("secret"));
    }

    #[test]
    fn test_all_lines_malformed_is_error() {
        let input = "not a cookie line\n";
        let err = parse_netscape_cookies(cursor(input)).unwrap_err();
        assert!(matches!(err, CookieError::NoCookiesFound { malformed_count: 1 }));
    }

    #[test]
    fn test_empty_file_is_ok() {
        let result = parse_netscape_cookies(cursor("")).unwrap();
        assert!(result.cookies.is_empty());
    }

    #[test]
    fn test_write_then_parse_preserves_cookies() {
        let mut session = Cookie::new("a", "1", "example.com");
        session.http_only = true;
        let mut persistent = Cookie::new("b", "2", "api.example.com");
        persistent.host_only = true;
        persistent.expires = Some(4_000_000_000);
        let mut expired = Cookie::new("c", "3", "example.com");
        expired.expires = Some(10);

        let mut out = Vec::new();
        write_netscape_cookies(&mut out, [&session, &persistent, &expired], 1_000).unwrap();

        let parsed = parse_netscape_cookies(Cursor::new(out)).unwrap();
        assert_eq!(parsed.cookies, vec![session, persistent]);
    }
}
