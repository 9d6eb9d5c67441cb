//! I/O module
//!
//! Everything that touches files or the network.
//!
//! # Components
//!
//! - `csv_format` - Replay CSV format (record conversion, balance output)
//! - `reader` - Streaming reader over a replay operations file
//! - `accrual_client` - HTTP client for the accrual service

pub mod accrual_client;
pub mod csv_format;
pub mod reader;

pub use accrual_client::HttpAccrualOracle;
pub use csv_format::{convert_csv_record, write_balances_csv, CsvRecord, LedgerOp};
pub use reader::OpsReader;
