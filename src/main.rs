//! GuardML - Main Entry Point
//!
//! Unsupervised anomaly detection for network telemetry, with CSV/PCAP
//! ingestion and batch or streaming scoring.

use clap::Parser;
use guardml::cli::{run, Cli};
use tracing::error;

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guardml=info"));

    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stderr());

    if is_tty {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    } else {
        // Structured JSON logging for non-interactive / production environments
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    let result = run(cli);

    if let Err(ref e) = result {
        error!(error = %e, "guardml exited with error");
    }

    result
}
