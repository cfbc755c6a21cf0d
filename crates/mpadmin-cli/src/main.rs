//! MultiPrints admin CLI.
//!
//! A terminal front end over `mpadmin-core`: sign in and out, inspect the
//! persisted session, and ask the route guard what a given dashboard path
//! would do for the current identity.

mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mpadmin_core::Config;

use commands::Command;

const USAGE: &str = "\
Usage: mpadmin <command> [args]

Commands:
  login [--email EMAIL] [--from PATH]   Sign in and persist the session
  logout                                Clear the persisted session
  status [--json]                       Show the restored session state
  check PATH [--json]                   Show the guard decision for PATH
  nav                                   List the sidebar entries for your role
  whoami                                Fetch your account from the backend

Environment:
  MPADMIN_API_URL, MPADMIN_STORAGE, MPADMIN_EMAIL, MPADMIN_PASSWORD, RUST_LOG";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, and additionally to a daily file when `log_dir` is
/// configured. The returned guard must live until exit so the file writer
/// flushes.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mpadmin.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if matches!(command, Command::Help) {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(api = %config.api_base_url, storage = ?config.storage, "mpadmin starting");

    commands::run(command, config).await
}
