//! CLI entry point for the easyhttp tool.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use easy_http::{ErrorCode, Form, OptionError, OptionKey, Session, SinkRef};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let mut session = Session::new();
    if let Err(e) = configure(&mut session, &args) {
        eprintln!("easyhttp: ({}) {e}", e.code().as_i32());
        return Ok(exit_code(e.code()));
    }

    if let Some(path) = &args.output {
        match std::fs::File::create(path) {
            Ok(file) => session.set_option(OptionKey::File, SinkRef::from_writer(file))?,
            Err(e) => {
                eprintln!("easyhttp: cannot create {}: {e}", path.display());
                return Ok(exit_code(ErrorCode::WriteError));
            }
        }
    }

    session.execute().await;
    let code = session.error_code();
    info!(code = code.as_i32(), "transfer finished");

    if args.info_json
        && let Some(outcome) = session.outcome()
    {
        eprintln!("{}", serde_json::to_string_pretty(outcome)?);
    }
    if !code.is_ok() && !args.quiet {
        eprintln!("easyhttp: ({}) {}", code.as_i32(), session.error_message());
    }

    session.close();
    Ok(exit_code(code))
}

fn configure(session: &mut Session, args: &Args) -> Result<(), OptionError> {
    if let Some(url) = &args.url {
        session.set_option(OptionKey::Url, url.as_str())?;
    }
    if let Some(method) = &args.request {
        session.set_option(OptionKey::CustomRequest, method.as_str())?;
    }
    if !args.form.is_empty() {
        session.set_option(OptionKey::HttpPost, Form::from_fields(args.form_fields()))?;
    } else if let Some(data) = args.post_data() {
        session.set_option(OptionKey::PostFields, data)?;
    }
    if let Some(path) = &args.upload_file {
        session.set_option(OptionKey::Upload, true)?;
        session.set_option(OptionKey::InFile, path.as_path())?;
    }
    if args.head {
        session.set_option(OptionKey::NoBody, true)?;
        session.set_option(OptionKey::Header, true)?;
    }
    if !args.headers.is_empty() {
        session.set_option(OptionKey::HttpHeader, args.headers.clone())?;
    }

    let (literal, files): (Vec<&String>, Vec<&String>) =
        args.cookie.iter().partition(|c| c.contains('='));
    if !literal.is_empty() {
        let joined: Vec<&str> = literal.iter().map(|c| c.as_str()).collect();
        session.set_option(OptionKey::Cookie, joined.join("; "))?;
    }
    for file in files {
        session.set_option(OptionKey::CookieFile, file.as_str())?;
    }
    if let Some(jar) = &args.cookie_jar {
        session.set_option(OptionKey::CookieJar, jar.as_path())?;
    }

    // MAXREDIRS > 1 switches following on; -L alone decides here.
    if let Some(max) = args.max_redirs {
        session.set_option(OptionKey::MaxRedirs, max)?;
    }
    session.set_option(OptionKey::FollowLocation, args.location)?;
    session.set_option(OptionKey::Header, args.include || args.head)?;
    session.set_option(OptionKey::FailOnError, args.fail)?;

    if let Some(user) = &args.user {
        session.set_option(OptionKey::UserPwd, user.as_str())?;
    }
    if let Some(proxy) = &args.proxy {
        session.set_option(OptionKey::Proxy, proxy.as_str())?;
    }
    if let Some(user) = &args.proxy_user {
        session.set_option(OptionKey::ProxyUserPwd, user.as_str())?;
    }
    if let Some(agent) = &args.user_agent {
        session.set_option(OptionKey::UserAgent, agent.as_str())?;
    }
    if let Some(referer) = &args.referer {
        session.set_option(OptionKey::Referer, referer.as_str())?;
    }
    if args.compressed {
        session.set_option(OptionKey::Encoding, "gzip")?;
    }
    if let Some(secs) = args.connect_timeout {
        session.set_option(OptionKey::ConnectTimeout, i64::from(secs))?;
    }
    if let Some(secs) = args.max_time {
        session.set_option(OptionKey::Timeout, i64::from(secs))?;
    }
    if let Some(cert) = &args.cert {
        session.set_option(OptionKey::SslCert, cert.as_path())?;
    }
    if args.http1_0 {
        session.set_option(OptionKey::HttpVersion, 1)?;
    }
    Ok(())
}

fn exit_code(code: ErrorCode) -> ExitCode {
    ExitCode::from(u8::try_from(code.as_i32()).unwrap_or(1))
}
