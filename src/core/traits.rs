//! Collaborator traits for storage and the accrual oracle
//!
//! The ledger core never talks to a database or the network directly. It is
//! written against these two traits so the backend can be swapped without
//! touching registration, ledger or reconciliation logic.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{
    AccountId, AccrualReport, Order, OrderStatus, OracleError, StorageError, Withdrawal,
};

/// Outcome of an insert-if-absent against a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was stored
    Inserted,

    /// A record with the same key already exists; nothing was written
    AlreadyExists,
}

/// Outcome of applying an oracle report to a stored order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualUpdate {
    /// Status (and bonus) moved forward
    Applied,

    /// The update was not forward progress and was dropped
    Ignored,

    /// No order with this number exists
    Missing,
}

/// Persistent store for orders and withdrawals
///
/// Implementations must make `insert_order_if_absent` and
/// `insert_withdrawal_if_absent` atomic against concurrent callers: exactly
/// one caller observes `Inserted` for a given key.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a new order unless its number is already taken
    async fn insert_order_if_absent(&self, order: Order) -> Result<InsertOutcome, StorageError>;

    /// Owner of an existing order
    async fn find_order_owner(&self, number: &str) -> Result<Option<AccountId>, StorageError>;

    /// All orders of an account, most recently submitted first
    async fn orders_for_account(&self, account: AccountId) -> Result<Vec<Order>, StorageError>;

    /// Up to `limit` orders in a non-terminal status, oldest first
    async fn pending_orders(&self, limit: usize) -> Result<Vec<Order>, StorageError>;

    /// Apply an oracle status and bonus to an order
    ///
    /// Only applied when the order is not terminal and `status` is forward
    /// progress. The bonus is recorded only for `PROCESSED`.
    async fn update_order_accrual(
        &self,
        number: &str,
        status: OrderStatus,
        bonus: Decimal,
    ) -> Result<AccrualUpdate, StorageError>;

    /// Sum of bonuses over the account's `PROCESSED` orders
    async fn sum_processed_bonuses(&self, account: AccountId) -> Result<Decimal, StorageError>;

    /// Sum of the account's withdrawal amounts
    async fn sum_withdrawals(&self, account: AccountId) -> Result<Decimal, StorageError>;

    /// Store a withdrawal unless its reference is already taken
    async fn insert_withdrawal_if_absent(
        &self,
        withdrawal: Withdrawal,
    ) -> Result<InsertOutcome, StorageError>;

    /// Owner of an existing withdrawal
    async fn find_withdrawal_owner(
        &self,
        reference: &str,
    ) -> Result<Option<AccountId>, StorageError>;

    /// Up to `limit` of the account's withdrawals, most recent first
    async fn withdrawals_for_account(
        &self,
        account: AccountId,
        limit: usize,
    ) -> Result<Vec<Withdrawal>, StorageError>;
}

/// External service that decides whether an order earns bonus and how much
#[async_trait]
pub trait AccrualOracle: Send + Sync {
    /// Look up the accrual state of an order
    ///
    /// `Ok(None)` means the oracle does not know the order yet.
    async fn accrual(&self, number: &str) -> Result<Option<AccrualReport>, OracleError>;
}
