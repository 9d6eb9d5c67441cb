//! Accrual reconciliation poller
//!
//! `AccrualPoller` periodically picks a bounded batch of orders that have not
//! reached a terminal status, asks the accrual oracle about each one and
//! moves them forward in the store.
//!
//! # Tick semantics
//!
//! - Ticks are single-flight. A tick that starts while another is running
//!   returns immediately with [`TickStatus::Skipped`].
//! - Each oracle query is bounded by `query_timeout`. A query that does not
//!   answer in time is abandoned and the order is retried on a later tick.
//! - A rate-limit reply stops the current tick and suspends every tick until
//!   the retry-after interval has elapsed.
//! - Not-found replies and transient failures leave the order untouched.
//! - Updates are monotonic; the store drops any reply that would move an
//!   order backward or touch a terminal order.
//!
//! # Shutdown
//!
//! [`AccrualPoller::spawn`] runs ticks on a timer until its cancellation
//! token fires. Cancellation is only observed between ticks, so an in-flight
//! tick always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::traits::{AccrualOracle, AccrualUpdate, Storage};
use crate::types::{AccrualReport, LoyaltyError, OracleError, Order, OrderStatus};

/// Longest suspension a single rate-limit reply can impose
pub const MAX_SUSPENSION: Duration = Duration::from_secs(60 * 60);

/// Configuration for the reconciliation loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Maximum number of orders fetched per tick
    pub batch_size: usize,
    /// Upper bound on a single oracle query
    pub query_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            batch_size: 15,
            query_timeout: Duration::from_secs(2),
        }
    }
}

impl PollerConfig {
    /// Create a new PollerConfig, replacing zero values with defaults
    pub fn new(interval: Duration, batch_size: usize, query_timeout: Duration) -> Self {
        let default = Self::default();

        let interval = if interval.is_zero() {
            warn!(default = ?default.interval, "Invalid poll interval (0), using default");
            default.interval
        } else {
            interval
        };

        let batch_size = if batch_size == 0 {
            warn!(default = default.batch_size, "Invalid batch size (0), using default");
            default.batch_size
        } else {
            batch_size
        };

        let query_timeout = if query_timeout.is_zero() {
            warn!(default = ?default.query_timeout, "Invalid query timeout (0), using default");
            default.query_timeout
        } else {
            query_timeout
        };

        Self {
            interval,
            batch_size,
            query_timeout,
        }
    }
}

/// How a tick ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickStatus {
    /// Every fetched order was queried
    #[default]
    Completed,
    /// Another tick was still running
    Skipped,
    /// An earlier rate-limit reply is still in effect
    Suspended,
    /// The oracle rate-limited this tick; remaining orders were not queried
    RateLimited,
}

/// Summary of one reconciliation tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub status: TickStatus,
    /// Pending orders fetched from the store
    pub fetched: usize,
    /// Orders whose status moved forward
    pub advanced: usize,
    /// Replies that were not forward progress
    pub unchanged: usize,
    /// Orders the oracle does not know yet
    pub not_found: usize,
    /// Queries or updates that failed and will be retried
    pub failed: usize,
}

impl TickReport {
    fn with_status(status: TickStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// Releases the single-flight flag when the tick ends, however it ends
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickGuard(flag))
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Background reconciliation of pending orders against the accrual oracle
pub struct AccrualPoller {
    storage: Arc<dyn Storage>,
    oracle: Arc<dyn AccrualOracle>,
    config: PollerConfig,
    in_flight: AtomicBool,
    /// Earliest instant at which oracle queries may resume
    resume_at: Mutex<Option<Instant>>,
}

impl AccrualPoller {
    pub fn new(
        storage: Arc<dyn Storage>,
        oracle: Arc<dyn AccrualOracle>,
        config: PollerConfig,
    ) -> Self {
        Self {
            storage,
            oracle,
            config,
            in_flight: AtomicBool::new(false),
            resume_at: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    fn backoff_remaining(&self) -> Option<Duration> {
        let mut resume_at = self
            .resume_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        match *resume_at {
            Some(at) if at > now => Some(at - now),
            Some(_) => {
                *resume_at = None;
                None
            }
            None => None,
        }
    }

    fn suspend_for(&self, retry_after: Duration) {
        let now = Instant::now();
        let until = now
            .checked_add(retry_after.min(MAX_SUSPENSION))
            .unwrap_or(now);

        let mut resume_at = self
            .resume_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *resume_at = Some(until);
    }

    /// Run one reconciliation tick
    ///
    /// Fails only when the pending-order query itself fails; per-order
    /// problems are logged and counted in the report.
    pub async fn run_tick(&self) -> Result<TickReport, LoyaltyError> {
        let Some(_guard) = TickGuard::acquire(&self.in_flight) else {
            debug!("Previous reconciliation tick still running, skipping");
            return Ok(TickReport::with_status(TickStatus::Skipped));
        };

        if let Some(remaining) = self.backoff_remaining() {
            debug!(?remaining, "Accrual oracle backoff in effect, skipping tick");
            return Ok(TickReport::with_status(TickStatus::Suspended));
        }

        let orders = self.storage.pending_orders(self.config.batch_size).await?;
        let mut report = TickReport {
            fetched: orders.len(),
            ..TickReport::default()
        };

        for order in orders {
            let reply = tokio::time::timeout(
                self.config.query_timeout,
                self.oracle.accrual(&order.number),
            )
            .await;

            match reply {
                Err(_) => {
                    warn!(
                        order = %order.number,
                        timeout = ?self.config.query_timeout,
                        "Accrual query timed out"
                    );
                    report.failed += 1;
                }
                Ok(Ok(Some(accrual))) => self.apply(&order, accrual, &mut report).await,
                Ok(Ok(None)) => {
                    debug!(order = %order.number, "Order not known to the accrual oracle yet");
                    report.not_found += 1;
                }
                Ok(Err(OracleError::RateLimited { retry_after })) => {
                    warn!(
                        ?retry_after,
                        max = ?MAX_SUSPENSION,
                        "Accrual oracle rate limited, suspending queries"
                    );
                    self.suspend_for(retry_after);
                    report.status = TickStatus::RateLimited;
                    break;
                }
                Ok(Err(e)) => {
                    warn!(order = %order.number, error = %e, "Accrual query failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn apply(&self, order: &Order, accrual: AccrualReport, report: &mut TickReport) {
        let status = OrderStatus::from(accrual.status);
        let bonus = accrual.accrual.unwrap_or(Decimal::ZERO);

        if bonus < Decimal::ZERO {
            warn!(order = %order.number, %bonus, "Oracle reported a negative accrual, ignoring");
            report.failed += 1;
            return;
        }

        match self
            .storage
            .update_order_accrual(&order.number, status, bonus)
            .await
        {
            Ok(AccrualUpdate::Applied) => {
                info!(
                    order = %order.number,
                    account = order.account,
                    from = %order.status,
                    to = %status,
                    %bonus,
                    "Order advanced"
                );
                report.advanced += 1;
            }
            Ok(AccrualUpdate::Ignored) | Ok(AccrualUpdate::Missing) => {
                debug!(order = %order.number, reported = %status, "Accrual reply is not forward progress");
                report.unchanged += 1;
            }
            Err(e) => {
                error!(order = %order.number, error = %e, "Failed to store accrual update");
                report.failed += 1;
            }
        }
    }

    /// Run ticks on a timer until `shutdown` is cancelled
    ///
    /// Missed ticks are skipped rather than queued.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval = ?self.config.interval,
                batch_size = self.config.batch_size,
                "Accrual poller started"
            );

            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match self.run_tick().await {
                    Ok(report) if report.advanced > 0 || report.failed > 0 => {
                        debug!(?report, "Reconciliation tick finished");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Reconciliation tick failed"),
                }
            }

            info!("Accrual poller stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::types::AccrualStatus;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    type Reply = Result<Option<AccrualReport>, OracleError>;

    /// Oracle that replays canned replies per order number
    ///
    /// Replies are consumed in order; the last one repeats forever. Unknown
    /// numbers report not found.
    #[derive(Default)]
    struct ScriptedOracle {
        replies: Mutex<HashMap<String, VecDeque<Reply>>>,
        hanging: HashSet<String>,
        gate: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn script(self, number: &str, replies: Vec<Reply>) -> Self {
            self.replies
                .lock()
                .unwrap()
                .insert(number.to_string(), replies.into());
            self
        }

        fn hang(mut self, number: &str) -> Self {
            self.hanging.insert(number.to_string());
            self
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccrualOracle for ScriptedOracle {
        async fn accrual(&self, number: &str) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.hanging.contains(number) {
                std::future::pending::<()>().await;
            }

            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(number) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap_or(Ok(None)),
                None => Ok(None),
            }
        }
    }

    fn report(number: &str, status: AccrualStatus, accrual: Option<Decimal>) -> Reply {
        Ok(Some(AccrualReport {
            order: number.to_string(),
            status,
            accrual,
        }))
    }

    async fn setup(
        numbers: &[&str],
        oracle: ScriptedOracle,
        config: PollerConfig,
    ) -> (Arc<AccrualPoller>, Arc<MemoryStore>, Arc<ScriptedOracle>) {
        let store = Arc::new(MemoryStore::new());
        for number in numbers {
            store
                .insert_order_if_absent(Order::new(*number, 1))
                .await
                .unwrap();
        }
        let oracle = Arc::new(oracle);
        let poller = Arc::new(AccrualPoller::new(store.clone(), oracle.clone(), config));
        (poller, store, oracle)
    }

    #[rstest]
    #[case::all_valid(Duration::from_millis(50), 5, Duration::from_secs(1), PollerConfig {
        interval: Duration::from_millis(50),
        batch_size: 5,
        query_timeout: Duration::from_secs(1),
    })]
    #[case::zero_interval(Duration::ZERO, 5, Duration::from_secs(1), PollerConfig {
        interval: Duration::from_millis(100),
        batch_size: 5,
        query_timeout: Duration::from_secs(1),
    })]
    #[case::zero_batch(Duration::from_millis(50), 0, Duration::from_secs(1), PollerConfig {
        interval: Duration::from_millis(50),
        batch_size: 15,
        query_timeout: Duration::from_secs(1),
    })]
    #[case::zero_timeout(Duration::from_millis(50), 5, Duration::ZERO, PollerConfig {
        interval: Duration::from_millis(50),
        batch_size: 5,
        query_timeout: Duration::from_secs(2),
    })]
    fn test_poller_config_zero_values_fallback(
        #[case] interval: Duration,
        #[case] batch_size: usize,
        #[case] query_timeout: Duration,
        #[case] expected: PollerConfig,
    ) {
        assert_eq!(PollerConfig::new(interval, batch_size, query_timeout), expected);
    }

    #[tokio::test]
    async fn test_tick_applies_processed_accrual() {
        let oracle = ScriptedOracle::default().script(
            "79927398713",
            vec![report(
                "79927398713",
                AccrualStatus::Processed,
                Some(Decimal::new(50050, 2)),
            )],
        );
        let (poller, store, _oracle) =
            setup(&["79927398713"], oracle, PollerConfig::default()).await;

        let tick = poller.run_tick().await.unwrap();

        assert_eq!(
            tick,
            TickReport {
                status: TickStatus::Completed,
                fetched: 1,
                advanced: 1,
                ..TickReport::default()
            }
        );
        let order = store.order("79927398713").unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.bonus, Decimal::new(50050, 2));
    }

    #[tokio::test]
    async fn test_tick_leaves_unknown_orders_pending() {
        let (poller, store, oracle) = setup(
            &["79927398713"],
            ScriptedOracle::default(),
            PollerConfig::default(),
        )
        .await;

        let first = poller.run_tick().await.unwrap();
        let second = poller.run_tick().await.unwrap();

        assert_eq!(first.not_found, 1);
        assert_eq!(second.not_found, 1);
        assert_eq!(oracle.calls(), 2);
        assert_eq!(store.order("79927398713").unwrap().status, OrderStatus::New);
    }

    #[tokio::test]
    async fn test_terminal_orders_never_change_again() {
        let number = "79927398713";
        let oracle = ScriptedOracle::default().script(
            number,
            vec![
                report(number, AccrualStatus::Processed, Some(Decimal::TEN)),
                report(number, AccrualStatus::Processing, None),
                report(number, AccrualStatus::Invalid, Some(Decimal::ZERO)),
            ],
        );
        let (poller, store, oracle) = setup(&[number], oracle, PollerConfig::default()).await;

        poller.run_tick().await.unwrap();
        let later = poller.run_tick().await.unwrap();

        assert_eq!(later.fetched, 0);
        assert_eq!(oracle.calls(), 1);
        let order = store.order(number).unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.bonus, Decimal::TEN);
    }

    #[tokio::test]
    async fn test_out_of_order_replies_do_not_regress_status() {
        let number = "79927398713";
        let oracle = ScriptedOracle::default().script(
            number,
            vec![
                report(number, AccrualStatus::Processing, None),
                report(number, AccrualStatus::Registered, None),
                report(number, AccrualStatus::Processing, None),
                report(number, AccrualStatus::Processed, Some(Decimal::new(725, 1))),
            ],
        );
        let (poller, store, _oracle) = setup(&[number], oracle, PollerConfig::default()).await;

        let first = poller.run_tick().await.unwrap();
        assert_eq!(first.advanced, 1);

        let backward = poller.run_tick().await.unwrap();
        assert_eq!(backward.unchanged, 1);
        assert_eq!(store.order(number).unwrap().status, OrderStatus::Processing);

        let duplicate = poller.run_tick().await.unwrap();
        assert_eq!(duplicate.unchanged, 1);

        let last = poller.run_tick().await.unwrap();
        assert_eq!(last.advanced, 1);
        let order = store.order(number).unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.bonus, Decimal::new(725, 1));
    }

    #[tokio::test]
    async fn test_rate_limit_stops_tick_and_suspends_later_ticks() {
        let oracle = ScriptedOracle::default().script(
            "79927398713",
            vec![Err(OracleError::RateLimited {
                retry_after: Duration::from_secs(60),
            })],
        );
        let (poller, store, oracle) = setup(
            &["79927398713", "12345678903", "49927398716"],
            oracle,
            PollerConfig::default(),
        )
        .await;

        let limited = poller.run_tick().await.unwrap();
        let suspended = poller.run_tick().await.unwrap();

        assert_eq!(limited.status, TickStatus::RateLimited);
        assert_eq!(limited.fetched, 3);
        assert_eq!(suspended, TickReport::with_status(TickStatus::Suspended));
        assert_eq!(oracle.calls(), 1);
        assert_eq!(store.order("12345678903").unwrap().status, OrderStatus::New);
    }

    #[tokio::test]
    async fn test_huge_retry_after_is_capped() {
        let oracle = ScriptedOracle::default().script(
            "79927398713",
            vec![Err(OracleError::RateLimited {
                retry_after: Duration::from_secs(u64::MAX),
            })],
        );
        let (poller, _store, oracle) =
            setup(&["79927398713"], oracle, PollerConfig::default()).await;

        let limited = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run_tick().await }
        })
        .await
        .expect("tick must not panic on a huge retry-after")
        .unwrap();

        assert_eq!(limited.status, TickStatus::RateLimited);
        let remaining = poller.backoff_remaining().unwrap();
        assert!(remaining <= MAX_SUSPENSION);
        assert!(remaining > MAX_SUSPENSION - Duration::from_secs(60));
        assert_eq!(
            poller.run_tick().await.unwrap().status,
            TickStatus::Suspended
        );
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_queries_resume_after_retry_after_elapses() {
        let number = "79927398713";
        let oracle = ScriptedOracle::default().script(
            number,
            vec![
                Err(OracleError::RateLimited {
                    retry_after: Duration::from_millis(30),
                }),
                report(number, AccrualStatus::Processed, Some(Decimal::ONE)),
            ],
        );
        let (poller, store, _oracle) = setup(&[number], oracle, PollerConfig::default()).await;

        assert_eq!(
            poller.run_tick().await.unwrap().status,
            TickStatus::RateLimited
        );
        tokio::time::sleep(Duration::from_millis(60)).await;
        let resumed = poller.run_tick().await.unwrap();

        assert_eq!(resumed.status, TickStatus::Completed);
        assert_eq!(resumed.advanced, 1);
        assert_eq!(store.order(number).unwrap().status, OrderStatus::Processed);
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_order_pending() {
        let number = "79927398713";
        let oracle = ScriptedOracle::default().script(
            number,
            vec![
                Err(OracleError::unavailable("HTTP 503")),
                report(number, AccrualStatus::Processed, Some(Decimal::TEN)),
            ],
        );
        let (poller, store, _oracle) = setup(&[number], oracle, PollerConfig::default()).await;

        let failed = poller.run_tick().await.unwrap();
        assert_eq!(failed.failed, 1);
        assert_eq!(store.order(number).unwrap().status, OrderStatus::New);

        let retried = poller.run_tick().await.unwrap();
        assert_eq!(retried.advanced, 1);
    }

    #[tokio::test]
    async fn test_hung_query_does_not_stall_batch() {
        let oracle = ScriptedOracle::default().hang("79927398713").script(
            "12345678903",
            vec![report("12345678903", AccrualStatus::Processed, Some(Decimal::ONE))],
        );
        let config = PollerConfig::new(
            Duration::from_millis(100),
            15,
            Duration::from_millis(50),
        );
        let (poller, store, _oracle) =
            setup(&["79927398713", "12345678903"], oracle, config).await;

        let tick = poller.run_tick().await.unwrap();

        assert_eq!(tick.failed, 1);
        assert_eq!(tick.advanced, 1);
        assert_eq!(store.order("79927398713").unwrap().status, OrderStatus::New);
        assert_eq!(
            store.order("12345678903").unwrap().status,
            OrderStatus::Processed
        );
    }

    #[tokio::test]
    async fn test_negative_accrual_is_rejected() {
        let number = "79927398713";
        let oracle = ScriptedOracle::default().script(
            number,
            vec![report(number, AccrualStatus::Processed, Some(Decimal::NEGATIVE_ONE))],
        );
        let (poller, store, _oracle) = setup(&[number], oracle, PollerConfig::default()).await;

        let tick = poller.run_tick().await.unwrap();

        assert_eq!(tick.failed, 1);
        assert_eq!(store.order(number).unwrap().status, OrderStatus::New);
    }

    #[tokio::test]
    async fn test_batch_size_bounds_each_tick() {
        let numbers: Vec<String> = (0..20u32)
            .map(|i| {
                let payload = format!("{:08}", i);
                (0..10)
                    .map(|d| format!("{payload}{d}"))
                    .find(|n| crate::core::luhn::is_valid(n))
                    .unwrap()
            })
            .collect();
        let refs: Vec<&str> = numbers.iter().map(String::as_str).collect();
        let (poller, _store, oracle) =
            setup(&refs, ScriptedOracle::default(), PollerConfig::default()).await;

        let tick = poller.run_tick().await.unwrap();

        assert_eq!(tick.fetched, 15);
        assert_eq!(oracle.calls(), 15);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_tick_is_skipped() {
        let gate = Arc::new(Notify::new());
        let oracle = ScriptedOracle::default().gated(gate.clone());
        let (poller, _store, oracle) =
            setup(&["79927398713"], oracle, PollerConfig::default()).await;

        let first = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run_tick().await }
        });
        while oracle.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let overlapping = poller.run_tick().await.unwrap();
        gate.notify_one();
        let finished = first.await.unwrap().unwrap();

        assert_eq!(overlapping.status, TickStatus::Skipped);
        assert_eq!(finished.status, TickStatus::Completed);
        assert_eq!(finished.not_found, 1);

        // The flag is released once the tick finishes
        gate.notify_one();
        let next = poller.run_tick().await.unwrap();
        assert_eq!(next.status, TickStatus::Completed);
    }

    #[tokio::test]
    async fn test_spawn_reconciles_until_shutdown() {
        let number = "79927398713";
        let oracle = ScriptedOracle::default().script(
            number,
            vec![report(number, AccrualStatus::Processed, Some(Decimal::TEN))],
        );
        let config = PollerConfig::new(Duration::from_millis(10), 15, Duration::from_secs(1));
        let (poller, store, _oracle) = setup(&[number], oracle, config).await;
        let shutdown = CancellationToken::new();

        let handle = poller.clone().spawn(shutdown.clone());

        let deadline = Instant::now() + Duration::from_secs(2);
        while store.order(number).unwrap().status != OrderStatus::Processed {
            assert!(Instant::now() < deadline, "order was never reconciled");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller did not stop after shutdown")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_lets_in_flight_tick_finish() {
        let number = "79927398713";
        let gate = Arc::new(Notify::new());
        let oracle = ScriptedOracle::default().gated(gate.clone()).script(
            number,
            vec![report(number, AccrualStatus::Processed, Some(Decimal::TEN))],
        );
        let config = PollerConfig::new(Duration::from_millis(10), 15, Duration::from_secs(5));
        let (poller, store, oracle) = setup(&[number], oracle, config).await;
        let shutdown = CancellationToken::new();

        let handle = poller.clone().spawn(shutdown.clone());
        while oracle.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        shutdown.cancel();
        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller did not stop after shutdown")
            .unwrap();

        let order = store.order(number).unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.bonus, Decimal::TEN);
        assert_eq!(oracle.calls(), 1);
    }
}
