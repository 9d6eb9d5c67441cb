//! Balance and withdrawal ledger
//!
//! This module provides `LedgerService`, which derives account balances from
//! processed orders and withdrawals and commits new withdrawals against them.
//!
//! # Design
//!
//! The balance is never stored. It is recomputed from the store as
//! `Σ bonus(PROCESSED orders) − Σ withdrawals` every time it is needed.
//!
//! A withdrawal is a read-balance-then-insert sequence, so it runs inside a
//! per-account critical section: an async mutex looked up in a `DashMap`
//! keyed by account id. Withdrawals for the same account are serialized;
//! withdrawals for different accounts never wait on each other.
//!
//! Inside the critical section the balance can only grow (the accrual
//! poller credits bonuses, nothing else debits), so a balance read under the
//! lock is a lower bound for the balance at insert time and the insert can
//! never overdraw the account.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::luhn;
use super::traits::{InsertOutcome, Storage};
use crate::types::{AccountId, Balance, LoyaltyError, StorageError, Submission, Withdrawal};

/// Maximum number of entries `withdrawals` returns
pub const WITHDRAWAL_HISTORY_LIMIT: usize = 10;

/// Computes balances and commits withdrawals
///
/// The per-account locks live in this instance and are shared by its clones.
/// Every withdrawal against a given store must go through one `LedgerService`
/// or a clone of it; two independently constructed services on the same
/// store do not serialize against each other.
///
/// The lock table keeps one entry per account that has ever withdrawn.
#[derive(Clone)]
pub struct LedgerService {
    storage: Arc<dyn Storage>,

    /// One async mutex per account that has ever withdrawn
    account_locks: Arc<DashMap<AccountId, Arc<Mutex<()>>>>,
}

impl LedgerService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            account_locks: Arc::new(DashMap::new()),
        }
    }

    fn account_lock(&self, account: AccountId) -> Arc<Mutex<()>> {
        self.account_locks.entry(account).or_default().clone()
    }

    /// Current balance and lifetime withdrawn total of an account
    ///
    /// Both aggregates are zero for an account with no history.
    pub async fn balance(&self, account: AccountId) -> Result<Balance, LoyaltyError> {
        let earned = self.storage.sum_processed_bonuses(account).await?;
        let withdrawn = self.storage.sum_withdrawals(account).await?;

        let current = earned
            .checked_sub(withdrawn)
            .ok_or_else(|| StorageError::backend("balance", "arithmetic overflow"))?;

        Ok(Balance { current, withdrawn })
    }

    /// Debit `amount` from an account's balance
    ///
    /// The reference must be Luhn-valid but does not have to name an order.
    ///
    /// # Returns
    ///
    /// * `Ok(Submission::Accepted)` - The withdrawal was committed
    /// * `Ok(Submission::AlreadySubmitted)` - The account already made a
    ///   withdrawal with this reference; the balance is unchanged
    /// * `Err(LoyaltyError::InvalidOrderNumber)` - Reference is empty or fails the Luhn check
    /// * `Err(LoyaltyError::InvalidAmount)` - Amount is zero or negative
    /// * `Err(LoyaltyError::AlreadySubmittedByOtherOwner)` - Another account used the reference
    /// * `Err(LoyaltyError::InsufficientBonuses)` - Balance does not cover the amount; nothing stored
    /// * `Err(LoyaltyError::Persistence)` - The store failed
    pub async fn withdraw(
        &self,
        account: AccountId,
        reference: &str,
        amount: Decimal,
    ) -> Result<Submission, LoyaltyError> {
        let reference = reference.trim();
        if !luhn::is_valid(reference) {
            return Err(LoyaltyError::invalid_order_number(reference));
        }
        if amount <= Decimal::ZERO {
            return Err(LoyaltyError::invalid_amount(amount));
        }

        let lock = self.account_lock(account);
        let _guard = lock.lock().await;

        let available = self.balance(account).await?.current;
        if available < amount {
            // A reused reference is reported as such even when the balance
            // would not cover it.
            if let Some(owner) = self.storage.find_withdrawal_owner(reference).await? {
                return self.resolve_duplicate(account, owner, reference);
            }

            debug!(account, %available, %amount, "Withdrawal rejected");
            return Err(LoyaltyError::insufficient_bonuses(account, available, amount));
        }

        match self
            .storage
            .insert_withdrawal_if_absent(Withdrawal::new(reference, amount, account))
            .await?
        {
            InsertOutcome::Inserted => {
                info!(account, reference, %amount, "Withdrawal committed");
                Ok(Submission::Accepted)
            }
            InsertOutcome::AlreadyExists => {
                let owner = self
                    .storage
                    .find_withdrawal_owner(reference)
                    .await?
                    .ok_or_else(|| {
                        StorageError::missing_record("find_withdrawal_owner", reference)
                    })?;
                self.resolve_duplicate(account, owner, reference)
            }
        }
    }

    fn resolve_duplicate(
        &self,
        account: AccountId,
        owner: AccountId,
        reference: &str,
    ) -> Result<Submission, LoyaltyError> {
        if owner == account {
            debug!(account, reference, "Withdrawal resubmitted by its owner");
            Ok(Submission::AlreadySubmitted)
        } else {
            debug!(account, owner, reference, "Withdrawal reference owned by another account");
            Err(LoyaltyError::submitted_by_other_owner(reference))
        }
    }

    /// The account's most recent withdrawals, newest first
    ///
    /// Returns at most [`WITHDRAWAL_HISTORY_LIMIT`] entries and fails with
    /// `NoWithdrawals` when there are none.
    pub async fn withdrawals(&self, account: AccountId) -> Result<Vec<Withdrawal>, LoyaltyError> {
        let withdrawals = self
            .storage
            .withdrawals_for_account(account, WITHDRAWAL_HISTORY_LIMIT)
            .await?;

        if withdrawals.is_empty() {
            return Err(LoyaltyError::NoWithdrawals { account });
        }

        Ok(withdrawals)
    }
}
