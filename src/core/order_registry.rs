//! Idempotent order intake
//!
//! `OrderRegistry` validates submitted order numbers and registers them
//! against the store's uniqueness constraint. It never checks existence
//! before inserting: the insert itself decides who wins, and only a losing
//! insert triggers the owner lookup that tells a resubmission apart from a
//! conflict.

use std::sync::Arc;

use tracing::{debug, info};

use super::luhn;
use super::traits::{InsertOutcome, Storage};
use crate::types::{AccountId, LoyaltyError, Order, StorageError, Submission};

/// Registers orders and lists an account's orders
#[derive(Clone)]
pub struct OrderRegistry {
    storage: Arc<dyn Storage>,
}

impl OrderRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Register an order number for an account
    ///
    /// Surrounding whitespace is ignored and the trimmed number is stored in
    /// status `NEW` with zero bonus.
    ///
    /// # Returns
    ///
    /// * `Ok(Submission::Accepted)` - The order was registered
    /// * `Ok(Submission::AlreadySubmitted)` - The account already owns it
    /// * `Err(LoyaltyError::InvalidOrderNumber)` - Empty or fails the Luhn check
    /// * `Err(LoyaltyError::AlreadySubmittedByOtherOwner)` - Another account owns it
    /// * `Err(LoyaltyError::Persistence)` - The store failed
    pub async fn add_order(
        &self,
        account: AccountId,
        number: &str,
    ) -> Result<Submission, LoyaltyError> {
        let number = number.trim();
        if !luhn::is_valid(number) {
            return Err(LoyaltyError::invalid_order_number(number));
        }

        match self
            .storage
            .insert_order_if_absent(Order::new(number, account))
            .await?
        {
            InsertOutcome::Inserted => {
                info!(account, order = number, "Order registered");
                Ok(Submission::Accepted)
            }
            InsertOutcome::AlreadyExists => {
                let owner = self
                    .storage
                    .find_order_owner(number)
                    .await?
                    .ok_or_else(|| StorageError::missing_record("find_order_owner", number))?;

                if owner == account {
                    debug!(account, order = number, "Order resubmitted by its owner");
                    Ok(Submission::AlreadySubmitted)
                } else {
                    debug!(account, owner, order = number, "Order owned by another account");
                    Err(LoyaltyError::submitted_by_other_owner(number))
                }
            }
        }
    }

    /// All orders of an account, most recently submitted first
    ///
    /// Fails with `NoOrders` when the account has not registered any.
    pub async fn orders(&self, account: AccountId) -> Result<Vec<Order>, LoyaltyError> {
        let orders = self.storage.orders_for_account(account).await?;

        if orders.is_empty() {
            return Err(LoyaltyError::NoOrders { account });
        }

        Ok(orders)
    }
}
