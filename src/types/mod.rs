//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `order`: Orders, their status lifecycle and oracle accrual reports
//! - `withdrawal`: Withdrawals and the derived account balance
//! - `error`: Error types for the ledger core and its collaborators

pub mod error;
pub mod order;
pub mod withdrawal;

pub use error::{LoyaltyError, OracleError, StorageError};
pub use order::{AccountId, AccrualReport, AccrualStatus, Order, OrderNumber, OrderStatus};
pub use withdrawal::{Balance, Submission, Withdrawal};
