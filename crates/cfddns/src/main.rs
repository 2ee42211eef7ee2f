//! Command-line entry point for **cfddns**
//!
//! * Takes no options; configuration comes from the environment
//! * Sets up tracing to stdout (journal) and the append-only outcome log
//! * Runs one update and maps the result to the exit status

use cfddns_core::{
    OUTCOME_TARGET,
    cfg::{DEFAULT_LOG_FILE, load_settings},
    load_config, run_once,
};
use clap::Parser;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
};
use tracing::{Subscriber, error, warn};
use tracing_subscriber::{
    Layer,
    filter::{EnvFilter, filter_fn},
    fmt::{self, MakeWriter},
    prelude::*,
    registry::LookupSpan,
};

/// Point a Cloudflare A record at this host's public IPv4 address.
///
/// Reads CLOUDFLARE_API_TOKEN, CLOUDFLARE_ZONE_ID and CLOUDFLARE_RECORD_NAME
/// (plus optional DDNS_* settings) from the environment. Start it from a
/// timer; it is not meant to run as a long-lived service.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {}

fn open_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Timestamped, uncoloured lines for the outcome target only.
fn outcome_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .with_filter(filter_fn(|meta| meta.target() == OUTCOME_TARGET))
}

/// Installs the subscriber; the stdout layer is always present, the file
/// layer only when the log file could be opened.
fn init_tracing(log_file: &Path) -> io::Result<()> {
    let (file, open_err) = match open_log(log_file) {
        Ok(f) => (Some(f), None),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer().compact().with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            ),
        )
        .with(file.map(|f| outcome_layer(Mutex::new(f))))
        .init();

    open_err.map_or(Ok(()), Err)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _cli = Cli::parse();

    // settings first, so a credentials error still lands in DDNS_LOG_FILE
    let log_file = load_settings()
        .map(|s| s.log_file)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE));
    if let Err(e) = init_tracing(&log_file) {
        warn!(
            "cannot open log file {}: {e}; logging to stdout only",
            log_file.display()
        );
    }

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(target: OUTCOME_TARGET, "{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    match run_once(&cfg).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
