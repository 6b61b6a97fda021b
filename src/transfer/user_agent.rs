//! Default `User-Agent` header.

/// Project URL included in the default User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/fierce/easy-http";

/// User-Agent sent when the session sets none.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("easy-http/{version} (+{PROJECT_UA_URL})")
}
