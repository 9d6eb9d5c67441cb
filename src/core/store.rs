//! In-memory storage backend
//!
//! This module provides `MemoryStore`, a [`Storage`] implementation that keeps
//! orders and withdrawals in concurrent maps.
//!
//! # Design
//!
//! `MemoryStore` uses `DashMap` keyed by order number and by withdrawal
//! reference. DashMap's entry API gives the atomic insert-if-absent the
//! registration path relies on: when several tasks race to insert the same
//! key, exactly one of them runs the insert closure.
//!
//! Every row carries an insertion sequence number. Listings sort on the
//! record timestamp and fall back to the sequence, so two records created in
//! the same clock tick still come back in a deterministic order.
//!
//! # Thread Safety
//!
//! All operations are safe to call concurrently. Operations on different keys
//! proceed in parallel; operations on the same key are serialized by the
//! shard lock.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::traits::{AccrualUpdate, InsertOutcome, Storage};
use crate::types::{AccountId, Order, OrderNumber, OrderStatus, StorageError, Withdrawal};

#[derive(Debug, Clone)]
struct Row<T> {
    seq: u64,
    record: T,
}

/// Thread-safe in-memory store for orders and withdrawals
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Orders keyed by order number
    orders: DashMap<OrderNumber, Row<Order>>,

    /// Withdrawals keyed by reference
    withdrawals: DashMap<OrderNumber, Row<Withdrawal>>,

    sequence: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty MemoryStore
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up a single order by number
    pub fn order(&self, number: &str) -> Option<Order> {
        self.orders.get(number).map(|row| row.record.clone())
    }
}

fn checked_sum<I>(operation: &'static str, amounts: I) -> Result<Decimal, StorageError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| StorageError::backend(operation, "arithmetic overflow"))
    })
}

#[async_trait]
impl Storage for MemoryStore {
    async fn insert_order_if_absent(&self, order: Order) -> Result<InsertOutcome, StorageError> {
        let mut inserted = false;
        self.orders.entry(order.number.clone()).or_insert_with(|| {
            inserted = true;
            Row {
                seq: self.next_seq(),
                record: order,
            }
        });

        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        })
    }

    async fn find_order_owner(&self, number: &str) -> Result<Option<AccountId>, StorageError> {
        Ok(self.orders.get(number).map(|row| row.record.account))
    }

    async fn orders_for_account(&self, account: AccountId) -> Result<Vec<Order>, StorageError> {
        let mut rows: Vec<Row<Order>> = self
            .orders
            .iter()
            .filter(|row| row.record.account == account)
            .map(|row| row.value().clone())
            .collect();

        rows.sort_by(|a, b| {
            b.record
                .uploaded_at
                .cmp(&a.record.uploaded_at)
                .then(b.seq.cmp(&a.seq))
        });

        Ok(rows.into_iter().map(|row| row.record).collect())
    }

    async fn pending_orders(&self, limit: usize) -> Result<Vec<Order>, StorageError> {
        let mut rows: Vec<Row<Order>> = self
            .orders
            .iter()
            .filter(|row| !row.record.status.is_terminal())
            .map(|row| row.value().clone())
            .collect();

        rows.sort_by_key(|row| row.seq);
        rows.truncate(limit);

        Ok(rows.into_iter().map(|row| row.record).collect())
    }

    async fn update_order_accrual(
        &self,
        number: &str,
        status: OrderStatus,
        bonus: Decimal,
    ) -> Result<AccrualUpdate, StorageError> {
        let Some(mut row) = self.orders.get_mut(number) else {
            return Ok(AccrualUpdate::Missing);
        };

        let order = &mut row.record;
        if !order.status.can_advance_to(status) {
            return Ok(AccrualUpdate::Ignored);
        }

        order.status = status;
        order.bonus = if status == OrderStatus::Processed {
            bonus
        } else {
            Decimal::ZERO
        };

        Ok(AccrualUpdate::Applied)
    }

    async fn sum_processed_bonuses(&self, account: AccountId) -> Result<Decimal, StorageError> {
        let bonuses = self
            .orders
            .iter()
            .filter(|row| {
                row.record.account == account && row.record.status == OrderStatus::Processed
            })
            .map(|row| row.record.bonus);

        checked_sum("sum_processed_bonuses", bonuses)
    }

    async fn sum_withdrawals(&self, account: AccountId) -> Result<Decimal, StorageError> {
        let amounts = self
            .withdrawals
            .iter()
            .filter(|row| row.record.account == account)
            .map(|row| row.record.amount);

        checked_sum("sum_withdrawals", amounts)
    }

    async fn insert_withdrawal_if_absent(
        &self,
        withdrawal: Withdrawal,
    ) -> Result<InsertOutcome, StorageError> {
        let mut inserted = false;
        self.withdrawals
            .entry(withdrawal.reference.clone())
            .or_insert_with(|| {
                inserted = true;
                Row {
                    seq: self.next_seq(),
                    record: withdrawal,
                }
            });

        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        })
    }

    async fn find_withdrawal_owner(
        &self,
        reference: &str,
    ) -> Result<Option<AccountId>, StorageError> {
        Ok(self.withdrawals.get(reference).map(|row| row.record.account))
    }

    async fn withdrawals_for_account(
        &self,
        account: AccountId,
        limit: usize,
    ) -> Result<Vec<Withdrawal>, StorageError> {
        let mut rows: Vec<Row<Withdrawal>> = self
            .withdrawals
            .iter()
            .filter(|row| row.record.account == account)
            .map(|row| row.value().clone())
            .collect();

        rows.sort_by(|a, b| {
            b.record
                .processed_at
                .cmp(&a.record.processed_at)
                .then(b.seq.cmp(&a.seq))
        });
        rows.truncate(limit);

        Ok(rows.into_iter().map(|row| row.record).collect())
    }
}
