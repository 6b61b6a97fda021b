//! Integration tests for the session cookie jar.

mod support;

use easy_http::{OptionKey, Session};
use support::session_for;
use support::socket_guard::start_mock_server_or_skip;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_response_cookie_sent_on_next_execution() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "sid=abc123; Path=/"))
        .mount(&server)
        .await;
    Mock::given(path("/account"))
        .and(header("cookie", "sid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server, "/login");
    assert!(session.execute().await.is_success());
    assert_eq!(session.cookie_jar().len(), 1);

    session
        .set_option(OptionKey::Url, format!("{}/account", server.uri()))
        .unwrap();
    assert_eq!(session.execute().await.content(), Some(&b"welcome"[..]));
}

#[tokio::test]
async fn test_cookie_set_during_redirect_reaches_next_hop() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Set-Cookie", "token=t1")
                .insert_header("Location", "/home"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/home"))
        .and(header("cookie", "token=t1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("home"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server, "/login");
    session.set_option(OptionKey::FollowLocation, true).unwrap();

    assert_eq!(session.execute().await.content(), Some(&b"home"[..]));
}

#[tokio::test]
async fn test_cookie_file_loaded_before_first_request() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(header("cookie", "pref=dark"))
        .respond_with(ResponseTemplate::new(200).set_body_string("themed"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cookie_file = dir.path().join("cookies.txt");
    std::fs::write(
        &cookie_file,
        "# Netscape HTTP Cookie File\n127.0.0.1\tFALSE\t/\tFALSE\t0\tpref\tdark\n",
    )
    .unwrap();

    let mut session = session_for(&server, "/");
    session
        .set_option(OptionKey::CookieFile, cookie_file.to_string_lossy().into_owned())
        .unwrap();

    assert_eq!(session.execute().await.content(), Some(&b"themed"[..]));
}

#[tokio::test]
async fn test_literal_cookie_option_combined_with_jar() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/set"))
        .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "a=1"))
        .mount(&server)
        .await;
    Mock::given(path("/check"))
        .and(header("cookie", "a=1; b=2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server, "/set");
    session.set_option(OptionKey::Cookie, "b=2").unwrap();
    session.execute().await;

    session
        .set_option(OptionKey::Url, format!("{}/check", server.uri()))
        .unwrap();
    assert!(session.execute().await.is_success());
}

#[tokio::test]
async fn test_cookie_jar_written_on_close() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "keep=yes; Max-Age=3600")
                .append_header("Set-Cookie", "gone=now; Max-Age=0"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("jar.txt");

    let mut session = session_for(&server, "/");
    session.set_option(OptionKey::CookieJar, jar.as_path()).unwrap();
    session.execute().await;
    session.close();

    let written = std::fs::read_to_string(&jar).unwrap();
    assert!(written.starts_with("# Netscape HTTP Cookie File"));
    assert!(written.contains("\tkeep\tyes"), "{written}");
    assert!(!written.contains("gone"), "{written}");
}

#[tokio::test]
async fn test_cookie_jar_written_when_session_dropped() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "id=7"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("jar.txt");
    {
        let mut session = Session::with_url(server.uri());
        session.set_option(OptionKey::ReturnTransfer, true).unwrap();
        session.set_option(OptionKey::CookieJar, jar.as_path()).unwrap();
        session.execute().await;
    }

    let written = std::fs::read_to_string(&jar).unwrap();
    assert!(written.contains("\tid\t7"), "{written}");
}

#[tokio::test]
async fn test_cookies_from_every_hop_accumulate() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/hop1"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Set-Cookie", "a=1")
                .insert_header("Location", "/hop2"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/hop2"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Set-Cookie", "b=2")
                .insert_header("Location", "/hop3"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/hop3"))
        .and(header("cookie", "a=1; b=2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("both"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server, "/hop1");
    session.set_option(OptionKey::FollowLocation, true).unwrap();

    assert_eq!(session.execute().await.content(), Some(&b"both"[..]));
    assert_eq!(session.cookie_jar().len(), 2);
}
