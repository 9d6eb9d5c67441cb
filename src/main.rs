//! Loyalty ledger replay CLI
//!
//! Replays order registrations and withdrawals from a CSV file against a live
//! accrual service and prints the resulting balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- -r http://localhost:8080 operations.csv > balances.csv
//! ACCRUAL_SYSTEM_ADDRESS=http://localhost:8080 cargo run -- --settle-ms 10000 operations.csv
//! LOYALTY_LOG=debug cargo run -- -r localhost:8080 --batch-size 30 operations.csv
//! ```
//!
//! Logs go to stderr so the balance CSV on stdout stays clean.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, oracle client setup, etc.)

use loyalty_ledger::cli;
use loyalty_ledger::io::HttpAccrualOracle;
use loyalty_ledger::Replay;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing from LOYALTY_LOG, defaulting to "info"
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOYALTY_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = cli::parse_args();

    let oracle = match HttpAccrualOracle::new(&args.accrual_address, args.query_timeout()) {
        Ok(oracle) => oracle,
        Err(e) => {
            error!(error = %e, "Failed to build accrual client");
            process::exit(1);
        }
    };
    info!(accrual = oracle.base_url(), input = %args.input_file.display(), "Starting replay");

    let replay = Replay::new(Arc::new(oracle), args.to_poller_config(), args.settle());
    let mut output = std::io::stdout();

    let result = tokio::select! {
        result = replay.run(&args.input_file, &mut output) => result,
        _ = tokio::signal::ctrl_c() => {
            error!("Interrupted before the replay finished");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Replay failed");
        process::exit(1);
    }
}
