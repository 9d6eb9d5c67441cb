//! Loyalty Ledger Library
//! # Overview
//!
//! Order intake, accrual reconciliation and bonus ledger for a loyalty
//! program. Customers register purchase order numbers, an external accrual
//! service decides how many bonus points each order earns, and customers
//! spend points through withdrawals that may never overdraw their balance.
//!
//! # Architecture
//!
//! - [`types`] - Domain types (Order, Withdrawal, Balance) and errors
//! - [`core`] - Business logic:
//!   - [`core::luhn`] - Order number validation
//!   - [`core::order_registry`] - Idempotent order intake
//!   - [`core::ledger`] - Balance and serialized withdrawals
//!   - [`core::poller`] - Background reconciliation against the accrual service
//!   - [`core::store`] - In-memory storage backend
//! - [`io`] - Replay CSV handling and the HTTP accrual client
//! - [`cli`] - CLI arguments parsing
//! - [`replay`] - Drives the core from an operations file
//!
//! # Order Lifecycle
//!
//! ```text
//! NEW -> REGISTERED -> PROCESSING -> PROCESSED
//!                                 \-> INVALID
//! ```
//!
//! Steps may be skipped but never reversed. `PROCESSED` and `INVALID` are
//! terminal, and only `PROCESSED` orders contribute bonus.
//!
//! # Balance
//!
//! - `current`: bonuses of processed orders minus all withdrawals
//! - `withdrawn`: sum of all withdrawals

pub mod cli;
pub mod core;
pub mod io;
pub mod replay;
pub mod types;

pub use core::{AccrualPoller, LedgerService, MemoryStore, OrderRegistry, PollerConfig};
pub use replay::{Replay, ReplaySummary};
pub use types::{
    AccountId, AccrualReport, AccrualStatus, Balance, LoyaltyError, Order, OrderNumber,
    OrderStatus, Submission, Withdrawal,
};
