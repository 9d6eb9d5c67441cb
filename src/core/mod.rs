//! Core ledger logic
//!
//! - `luhn` - Order number validation
//! - `traits` - Storage and accrual oracle abstractions
//! - `store` - In-memory `Storage` implementation
//! - `order_registry` - Idempotent order intake and listing
//! - `ledger` - Balance and serialized withdrawals
//! - `poller` - Background reconciliation against the accrual oracle

pub mod ledger;
pub mod luhn;
pub mod order_registry;
pub mod poller;
pub mod store;
pub mod traits;

pub use ledger::{LedgerService, WITHDRAWAL_HISTORY_LIMIT};
pub use order_registry::OrderRegistry;
pub use poller::{AccrualPoller, PollerConfig, TickReport, TickStatus};
pub use store::MemoryStore;
pub use traits::{AccrualOracle, AccrualUpdate, InsertOutcome, Storage};
