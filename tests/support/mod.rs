//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use easy_http::{OptionKey, Session};
use wiremock::MockServer;

/// Session pointed at `path` on the mock server, returning the body in memory.
pub fn session_for(server: &MockServer, path: &str) -> Session {
    let mut session = Session::with_url(format!("{}{path}", server.uri()));
    session
        .set_option(OptionKey::ReturnTransfer, true)
        .expect("RETURNTRANSFER is always accepted");
    session
}
