//! Error types for the loyalty ledger
//!
//! This module defines the errors returned by the ledger core and by its two
//! external collaborators, the storage backend and the accrual oracle.
//!
//! # Error Categories
//!
//! - **Validation Errors**: malformed order numbers, non-positive amounts
//! - **Conflict Errors**: identifier already owned by another account
//! - **Ledger Errors**: insufficient bonuses for a withdrawal
//! - **Not Found Errors**: account has no orders or no withdrawals
//! - **Persistence Errors**: storage backend failures, surfaced to the caller
//! - **Replay Errors**: file and CSV problems in the replay CLI
//!
//! Oracle failures live in [`OracleError`] and never reach registry or
//! ledger callers; the accrual poller absorbs them.

use super::order::AccountId;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the ledger core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoyaltyError {
    /// Order number or withdrawal reference is empty or fails the Luhn check
    ///
    /// Terminal for the call, never retried.
    #[error("Invalid order number '{number}'")]
    InvalidOrderNumber {
        /// The rejected input
        number: String,
    },

    /// Withdrawal amount is zero or negative
    #[error("Invalid amount {amount}: must be positive")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Identifier is already owned by a different account
    ///
    /// The same-owner case is not an error; see
    /// [`Submission::AlreadySubmitted`](crate::types::Submission).
    #[error("Order number {number} has already been submitted by another account")]
    AlreadySubmittedByOtherOwner {
        /// The conflicting identifier
        number: String,
    },

    /// Withdrawal would drive the balance negative
    ///
    /// Nothing is stored when this is returned.
    #[error(
        "Insufficient bonuses for account {account}: available {available}, requested {requested}"
    )]
    InsufficientBonuses {
        /// Account ID
        account: AccountId,
        /// Balance at the time of the check
        available: Decimal,
        /// Requested withdrawal amount
        requested: Decimal,
    },

    /// Account has not registered any orders
    #[error("Account {account} has no orders")]
    NoOrders {
        /// Account ID
        account: AccountId,
    },

    /// Account has not made any withdrawals
    #[error("Account {account} has no withdrawals")]
    NoWithdrawals {
        /// Account ID
        account: AccountId,
    },

    /// Storage backend failure
    ///
    /// Surfaced as a failure of the specific call. The core does not retry.
    #[error("Persistence error: {message}")]
    Persistence {
        /// Description of the storage failure
        message: String,
    },

    /// Input file not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// Recoverable in the replay CLI: the malformed row is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

/// Storage backend failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend could not complete the operation
    #[error("{operation}: {message}")]
    Backend {
        /// Storage operation that failed
        operation: &'static str,
        /// Backend-specific description
        message: String,
    },

    /// A record that must exist was missing
    #[error("{operation}: no record for '{key}'")]
    MissingRecord {
        /// Storage operation that failed
        operation: &'static str,
        /// Key that was looked up
        key: String,
    },
}

/// Accrual oracle failure
///
/// Every variant is transient from the poller's point of view: the order
/// stays pending and is retried on a later tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// Oracle asked us to slow down
    #[error("Accrual oracle rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// How long to stop issuing queries
        retry_after: Duration,
    },

    /// Network failure, server error or unexpected status
    #[error("Accrual oracle unavailable: {message}")]
    Unavailable {
        /// Description of the failure
        message: String,
    },

    /// Response could not be decoded
    #[error("Malformed accrual response: {message}")]
    Malformed {
        /// Description of the decoding failure
        message: String,
    },
}

// Conversion from StorageError to LoyaltyError
impl From<StorageError> for LoyaltyError {
    fn from(error: StorageError) -> Self {
        LoyaltyError::Persistence {
            message: error.to_string(),
        }
    }
}

// Conversion from io::Error to LoyaltyError
impl From<std::io::Error> for LoyaltyError {
    fn from(error: std::io::Error) -> Self {
        LoyaltyError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LoyaltyError
impl From<csv::Error> for LoyaltyError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LoyaltyError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Conversion from reqwest::Error to OracleError
impl From<reqwest::Error> for OracleError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            OracleError::Malformed {
                message: error.to_string(),
            }
        } else {
            OracleError::Unavailable {
                message: error.to_string(),
            }
        }
    }
}

// Helper functions for creating common errors

impl LoyaltyError {
    /// Create an InvalidOrderNumber error
    pub fn invalid_order_number(number: &str) -> Self {
        LoyaltyError::InvalidOrderNumber {
            number: number.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        LoyaltyError::InvalidAmount { amount }
    }

    /// Create an AlreadySubmittedByOtherOwner error
    pub fn submitted_by_other_owner(number: &str) -> Self {
        LoyaltyError::AlreadySubmittedByOtherOwner {
            number: number.to_string(),
        }
    }

    /// Create an InsufficientBonuses error
    pub fn insufficient_bonuses(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        LoyaltyError::InsufficientBonuses {
            account,
            available,
            requested,
        }
    }

    /// Whether the error is a caller-side validation failure
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LoyaltyError::InvalidOrderNumber { .. } | LoyaltyError::InvalidAmount { .. }
        )
    }
}

impl StorageError {
    /// Create a Backend error
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        StorageError::Backend {
            operation,
            message: message.into(),
        }
    }

    /// Create a MissingRecord error
    pub fn missing_record(operation: &'static str, key: &str) -> Self {
        StorageError::MissingRecord {
            operation,
            key: key.to_string(),
        }
    }
}

impl OracleError {
    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        OracleError::Unavailable {
            message: message.into(),
        }
    }

    /// Create a Malformed error
    pub fn malformed(message: impl Into<String>) -> Self {
        OracleError::Malformed {
            message: message.into(),
        }
    }
}
