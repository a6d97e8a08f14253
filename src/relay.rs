// src/relay.rs
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::watch;

use crate::ledger::Ledger;
use crate::notify::Notifier;
use crate::retry::{retry_async, RetryPolicy};
use crate::source::{ContentSource, Item};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_fetched_total", "Items fetched from the content source.");
        describe_counter!(
            "relay_fetch_errors_total",
            "Cycles whose fetch exhausted its retries."
        );
        describe_counter!(
            "relay_delivered_total",
            "Items delivered and recorded in the ledger."
        );
        describe_counter!(
            "relay_delivery_failures_total",
            "Items whose delivery exhausted its retries."
        );
        describe_gauge!("relay_last_cycle_ts", "Unix ts when the last cycle ran.");
    });
}

/// `score` meets the configured minimum and the id has not been relayed yet.
/// Both sides are re-checked every cycle: the upstream score is mutable, the
/// ledger membership is permanent.
pub fn is_eligible(item: &Item, ledger: &Ledger, minimum_score: i64) -> bool {
    item.score >= minimum_score && !ledger.contains(&item.id)
}

/// The fixed two-line message shape: bold title, then the url.
pub fn format_message(item: &Item) -> String {
    format!("**{}**\n{}", item.title, item.url)
}

/// The poll-filter-notify loop. Single task: fetch a batch, deliver every
/// eligible item, record each success in the ledger, sleep, repeat until
/// cancelled.
pub struct Relay {
    source: Box<dyn ContentSource>,
    notifier: Box<dyn Notifier>,
    ledger: Ledger,
    minimum_score: i64,
    poll_interval: Duration,
    fetch_retry: RetryPolicy,
}

impl Relay {
    pub fn new(
        source: Box<dyn ContentSource>,
        notifier: Box<dyn Notifier>,
        ledger: Ledger,
        minimum_score: i64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            notifier,
            ledger,
            minimum_score,
            poll_interval,
            fetch_retry: RetryPolicy::default(),
        }
    }

    pub fn with_fetch_retry(mut self, retry: RetryPolicy) -> Self {
        self.fetch_retry = retry;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// One fetch-filter-deliver pass. Fetch failure degrades the cycle to
    /// zero eligible items (logged, not propagated); a failed delivery skips
    /// only that item. A ledger write failure after a successful delivery
    /// does propagate: that is the one error here that risks a duplicate.
    pub async fn run_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        ensure_metrics_described();
        tracing::info!(source = self.source.name(), "checking for new posts");

        let source = &self.source;
        let items = match retry_async(
            self.fetch_retry,
            "source fetch",
            Some(shutdown.clone()),
            || source.fetch_latest(),
        )
        .await
        {
            Ok(items) => items,
            Err(e) => {
                counter!("relay_fetch_errors_total").increment(1);
                tracing::warn!(
                    source = self.source.name(),
                    error = ?e,
                    "fetch failed after retries, treating cycle as empty"
                );
                Vec::new()
            }
        };
        counter!("relay_fetched_total").increment(items.len() as u64);

        for item in items {
            if *shutdown.borrow() {
                tracing::info!("cancellation observed mid-batch, stopping deliveries");
                break;
            }
            if !is_eligible(&item, &self.ledger, self.minimum_score) {
                continue;
            }
            match self.notifier.send(&format_message(&item)).await {
                Ok(()) => {
                    self.ledger
                        .record(&item.id)
                        .with_context(|| {
                            format!("recording {} after delivery; duplicate possible on restart", item.id)
                        })?;
                    counter!("relay_delivered_total").increment(1);
                    tracing::info!(id = %item.id, score = item.score, "relayed post");
                }
                Err(e) => {
                    counter!("relay_delivery_failures_total").increment(1);
                    tracing::error!(
                        id = %item.id,
                        error = ?e,
                        "delivery failed, post stays eligible for the next cycle"
                    );
                }
            }
        }

        gauge!("relay_last_cycle_ts").set(now_unix() as f64);
        tracing::info!("cycle complete");
        Ok(())
    }

    /// Run cycles forever, sleeping `poll_interval` between them. The sleep
    /// is raced against the shutdown signal, so cancellation is observed
    /// within one tick. Cycle errors are logged and non-terminal.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            minimum_score = self.minimum_score,
            already_recorded = self.ledger.len(),
            "relay loop started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            if let Err(e) = self.run_cycle(&mut shutdown).await {
                tracing::error!(error = ?e, "cycle failed, continuing after the poll interval");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                res = shutdown.changed() => {
                    // A dropped sender means cancellation can never arrive.
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("relay loop terminated");
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
