use crate::core::PollerConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Replay loyalty orders and withdrawals against an accrual service
#[derive(Parser, Debug)]
#[command(name = "loyalty-ledger")]
#[command(
    about = "Replay loyalty orders and withdrawals against an accrual service",
    long_about = None
)]
pub struct CliArgs {
    /// Input CSV file with columns type,account,number,amount
    #[arg(value_name = "INPUT", help = "Path to the operations CSV file")]
    pub input_file: PathBuf,

    /// Base address of the accrual service
    #[arg(
        short = 'r',
        long = "accrual-address",
        env = "ACCRUAL_SYSTEM_ADDRESS",
        value_name = "ADDRESS",
        help = "Accrual service address, e.g. http://localhost:8080"
    )]
    pub accrual_address: String,

    /// Time between reconciliation ticks
    #[arg(
        long = "poll-interval-ms",
        value_name = "MILLIS",
        default_value_t = 100,
        help = "Milliseconds between reconciliation ticks"
    )]
    pub poll_interval_ms: u64,

    /// Orders queried per tick
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        default_value_t = 15,
        help = "Maximum number of orders queried per tick"
    )]
    pub batch_size: usize,

    /// Upper bound on one accrual query
    #[arg(
        long = "query-timeout-ms",
        value_name = "MILLIS",
        default_value_t = 2000,
        help = "Milliseconds before a single accrual query is abandoned"
    )]
    pub query_timeout_ms: u64,

    /// How long orders are given to reconcile before withdrawals apply
    #[arg(
        long = "settle-ms",
        value_name = "MILLIS",
        default_value_t = 5000,
        help = "Milliseconds to wait for pending orders before applying withdrawals"
    )]
    pub settle_ms: u64,
}

impl CliArgs {
    /// Build the poller configuration, replacing zero values with defaults
    pub fn to_poller_config(&self) -> PollerConfig {
        PollerConfig::new(
            Duration::from_millis(self.poll_interval_ms),
            self.batch_size,
            self.query_timeout(),
        )
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
