//! Withdrawal and balance types for the loyalty ledger

use super::order::{AccountId, OrderNumber};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A debit against an account's bonus ledger
///
/// The reference must be Luhn-valid but does not have to name an existing
/// order. References are globally unique across accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Globally unique reference
    pub reference: OrderNumber,

    /// Amount debited, always positive
    pub amount: Decimal,

    /// Account the amount was debited from
    pub account: AccountId,

    /// When the withdrawal was committed
    pub processed_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn new(reference: impl Into<OrderNumber>, amount: Decimal, account: AccountId) -> Self {
        Withdrawal {
            reference: reference.into(),
            amount,
            account,
            processed_at: Utc::now(),
        }
    }
}

/// Derived account balance
///
/// Never stored; computed from processed orders and withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    /// Bonus available for withdrawal
    pub current: Decimal,

    /// Total withdrawn over the account's lifetime
    pub withdrawn: Decimal,
}

/// Successful outcome of an idempotent submission
///
/// Resubmitting an order number or withdrawal reference the same account
/// already owns is not an error; it reports `AlreadySubmitted` and changes
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The submission created a new record
    Accepted,

    /// The caller already owns a record with this identifier
    AlreadySubmitted,
}
