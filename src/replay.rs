//! Replay of an operations file against the ledger core
//!
//! `Replay` drives the registry, the accrual poller and the ledger from a CSV
//! file of `order` and `withdraw` rows, then reports every account's
//! balance.
//!
//! # Phases
//!
//! 1. Every `order` row is registered as it is read; `withdraw` rows are
//!    queued in file order.
//! 2. The accrual poller runs in the background until no order is pending
//!    or the settle window closes.
//! 3. Queued withdrawals are applied in file order.
//! 4. Balances of every account named in the file are written as CSV.
//!
//! # Error Handling
//!
//! Malformed rows and rejected operations are logged and skipped. File
//! errors and storage failures abort the replay.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::{
    AccrualOracle, AccrualPoller, LedgerService, MemoryStore, OrderRegistry, PollerConfig,
    Storage,
};
use crate::io::{write_balances_csv, LedgerOp, OpsReader};
use crate::types::{AccountId, LoyaltyError, Submission};

/// Counters describing what a replay did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub orders_accepted: usize,
    pub orders_duplicate: usize,
    pub orders_rejected: usize,
    pub withdrawals_applied: usize,
    pub withdrawals_duplicate: usize,
    pub withdrawals_rejected: usize,
    pub rows_skipped: usize,
    /// Orders still not terminal when the settle window closed
    pub pending_after_settle: usize,
}

/// Ledger core wired to an in-memory store for one replay
pub struct Replay {
    store: Arc<MemoryStore>,
    registry: OrderRegistry,
    ledger: LedgerService,
    poller: Arc<AccrualPoller>,
    settle: Duration,
}

impl Replay {
    /// Create a replay against `oracle`
    ///
    /// `settle` bounds how long the poller is given to reconcile orders
    /// before withdrawals are applied.
    pub fn new(oracle: Arc<dyn AccrualOracle>, config: PollerConfig, settle: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let storage: Arc<dyn Storage> = store.clone();

        Self {
            registry: OrderRegistry::new(storage.clone()),
            ledger: LedgerService::new(storage.clone()),
            poller: Arc::new(AccrualPoller::new(storage, oracle, config)),
            store,
            settle,
        }
    }

    /// Replay `input` and write final balances to `output`
    pub async fn run(
        &self,
        input: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LoyaltyError> {
        let reader = OpsReader::new(input)?;
        let mut summary = ReplaySummary::default();
        let mut accounts = BTreeSet::new();
        let mut withdrawals: Vec<(AccountId, String, Decimal)> = Vec::new();

        for result in reader {
            let op = match result {
                Ok(op) => op,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed row");
                    summary.rows_skipped += 1;
                    continue;
                }
            };

            accounts.insert(op.account());
            match op {
                LedgerOp::Order { account, number } => {
                    self.register(account, &number, &mut summary).await?;
                }
                LedgerOp::Withdraw {
                    account,
                    reference,
                    amount,
                } => withdrawals.push((account, reference, amount)),
            }
        }

        summary.pending_after_settle = self.settle().await?;

        for (account, reference, amount) in withdrawals {
            self.withdraw(account, &reference, amount, &mut summary)
                .await?;
        }

        let mut balances = Vec::with_capacity(accounts.len());
        for account in accounts {
            balances.push((account, self.ledger.balance(account).await?));
        }
        write_balances_csv(&balances, output)?;

        info!(?summary, "Replay finished");
        Ok(summary)
    }

    async fn register(
        &self,
        account: AccountId,
        number: &str,
        summary: &mut ReplaySummary,
    ) -> Result<(), LoyaltyError> {
        match self.registry.add_order(account, number).await {
            Ok(Submission::Accepted) => summary.orders_accepted += 1,
            Ok(Submission::AlreadySubmitted) => summary.orders_duplicate += 1,
            Err(e @ LoyaltyError::Persistence { .. }) => return Err(e),
            Err(e) => {
                warn!(account, order = number, error = %e, "Order rejected");
                summary.orders_rejected += 1;
            }
        }
        Ok(())
    }

    async fn withdraw(
        &self,
        account: AccountId,
        reference: &str,
        amount: Decimal,
        summary: &mut ReplaySummary,
    ) -> Result<(), LoyaltyError> {
        match self.ledger.withdraw(account, reference, amount).await {
            Ok(Submission::Accepted) => summary.withdrawals_applied += 1,
            Ok(Submission::AlreadySubmitted) => summary.withdrawals_duplicate += 1,
            Err(e @ LoyaltyError::Persistence { .. }) => return Err(e),
            Err(e) => {
                warn!(account, reference, error = %e, "Withdrawal rejected");
                summary.withdrawals_rejected += 1;
            }
        }
        Ok(())
    }

    /// Run the poller until nothing is pending or the settle window closes
    ///
    /// Returns the number of orders still pending afterwards.
    async fn settle(&self) -> Result<usize, LoyaltyError> {
        let shutdown = CancellationToken::new();
        let handle = self.poller.clone().spawn(shutdown.clone());
        let deadline = Instant::now().checked_add(self.settle);

        let waited = self.wait_until_settled(deadline).await;

        shutdown.cancel();
        if let Err(e) = handle.await {
            error!(error = %e, "Accrual poller task failed");
        }
        waited?;

        let pending = self.store.pending_orders(usize::MAX).await?.len();
        if pending > 0 {
            warn!(pending, settle = ?self.settle, "Orders still pending after settle window");
        }
        Ok(pending)
    }

    /// A `None` deadline waits until every order is terminal
    async fn wait_until_settled(&self, deadline: Option<Instant>) -> Result<(), LoyaltyError> {
        loop {
            let pending = self.store.pending_orders(1).await?;
            if pending.is_empty() {
                debug!("All orders reconciled");
                return Ok(());
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(());
            }
            tokio::time::sleep(self.poller.config().interval).await;
        }
    }
}
