//! catalog-admin - terminal front end for the product catalog.
//!
//! Every command resolves to a route and goes through the same guard the
//! core enforces, so protected pages redirect to login when signed out.
//!
//! # Usage
//!
//! ```bash
//! catalog-admin login --username admin@example.com
//! catalog-admin products list
//! catalog-admin products new name=Espresso slug=espresso price=2.5 is_active=true
//! catalog-admin products edit 7 price=3
//! catalog-admin products delete 7 --yes
//! catalog-admin open /products/7
//! catalog-admin logout
//! ```

mod app;
mod cli;
mod pages;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cli::Cli;

/// Log file name used when `CATALOG_LOG_DIR` is set
const LOG_FILE_NAME: &str = "catalog-admin.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, or to a file in `CATALOG_LOG_DIR` when set. The returned
/// guard must live until exit so buffered file output is flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var("CATALOG_LOG_DIR").ok().filter(|d| !d.is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();
    info!(ephemeral = cli.ephemeral, "catalog-admin starting");

    let result = match App::new(cli.ephemeral) {
        Ok(mut app) => app.run(cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, "Command failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
