//! Order-related types for the loyalty ledger
//!
//! This module defines orders, the status lifecycle they move through while
//! the accrual oracle works on them, and the report the oracle returns.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account identifier
///
/// Supplied explicitly by the caller on every operation.
pub type AccountId = i64;

/// Order number
///
/// A string of decimal digits that passes the Luhn check.
pub type OrderNumber = String;

/// Status of an order as it moves through accrual
///
/// Statuses only move forward:
///
/// ```text
/// NEW ─┬─> REGISTERED ─┬─> PROCESSED
///      │       │        │
///      │       v        │
///      └─> PROCESSING ──┴─> INVALID
/// ```
///
/// `PROCESSED` and `INVALID` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Registered locally, not yet seen by the oracle
    New,

    /// Oracle knows the order but has not started calculating
    Registered,

    /// Oracle is calculating the accrual
    Processing,

    /// Accrual calculated; the bonus is final
    Processed,

    /// Oracle rejected the order; no bonus will ever be credited
    Invalid,
}

impl OrderStatus {
    /// Whether no further status or bonus writes are allowed
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Processed | OrderStatus::Invalid)
    }

    fn rank(self) -> u8 {
        match self {
            OrderStatus::New => 0,
            OrderStatus::Registered => 1,
            OrderStatus::Processing => 2,
            OrderStatus::Processed | OrderStatus::Invalid => 3,
        }
    }

    /// Whether moving from `self` to `next` is forward progress
    ///
    /// Terminal statuses never advance. Repeating the current status or
    /// stepping back to an earlier one is not progress.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Registered => "REGISTERED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Processed => "PROCESSED",
            OrderStatus::Invalid => "INVALID",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loyalty order owned by the account that first registered it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Globally unique, Luhn-valid order number
    pub number: OrderNumber,

    /// Current accrual status
    pub status: OrderStatus,

    /// Bonus credited to the owner
    ///
    /// Zero until the order reaches `PROCESSED`, fixed afterwards.
    pub bonus: Decimal,

    /// Account that owns the order
    pub account: AccountId,

    /// When the order was registered
    pub uploaded_at: DateTime<Utc>,
}

impl Order {
    /// Create a freshly submitted order in status `NEW` with zero bonus
    pub fn new(number: impl Into<OrderNumber>, account: AccountId) -> Self {
        Order {
            number: number.into(),
            status: OrderStatus::New,
            bonus: Decimal::ZERO,
            account,
            uploaded_at: Utc::now(),
        }
    }
}

/// Status values the accrual oracle reports
///
/// The oracle never reports `NEW`; that status only exists locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Processed,
    Invalid,
}

impl From<AccrualStatus> for OrderStatus {
    fn from(status: AccrualStatus) -> Self {
        match status {
            AccrualStatus::Registered => OrderStatus::Registered,
            AccrualStatus::Processing => OrderStatus::Processing,
            AccrualStatus::Processed => OrderStatus::Processed,
            AccrualStatus::Invalid => OrderStatus::Invalid,
        }
    }
}

/// Accrual report returned by the oracle for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualReport {
    /// Order number the report refers to
    pub order: OrderNumber,

    /// Oracle-side status
    pub status: AccrualStatus,

    /// Calculated accrual, present once the order is processed
    #[serde(default)]
    pub accrual: Option<Decimal>,
}
