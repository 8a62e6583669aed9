use crate::broadcast::SnapshotBroadcaster;
use crate::error::Result;
use crate::sampler::RateSampler;
use crate::store::UsageStore;
use chrono::{Local, NaiveDate};
use common::{DailyUsage, RateSnapshot};
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
const FLUSH_EVERY_SAMPLES: u32 = 10;

/// In-memory accumulation bucket for the current day.
struct DayTotals {
    usage: DailyUsage,
    samples_since_flush: u32,
}

impl DayTotals {
    fn starting(day: NaiveDate) -> Self {
        Self {
            usage: DailyUsage::empty(day),
            samples_since_flush: 0,
        }
    }

    fn resume(row: DailyUsage) -> Self {
        Self {
            usage: row,
            samples_since_flush: 0,
        }
    }

    /// On a date change, swaps in a fresh bucket for `today` and hands back
    /// the finished day. The flush cadence counter survives the boundary.
    fn rollover(&mut self, today: NaiveDate) -> Option<DailyUsage> {
        if self.usage.day == today {
            return None;
        }
        Some(mem::replace(&mut self.usage, DailyUsage::empty(today)))
    }

    fn fold(&mut self, snapshot: &RateSnapshot) {
        self.usage.bytes_sent += snapshot.sent_delta;
        self.usage.bytes_recv += snapshot.recv_delta;
        self.usage.max_up_speed = self.usage.max_up_speed.max(snapshot.up_speed);
        self.usage.max_down_speed = self.usage.max_down_speed.max(snapshot.down_speed);
        self.usage.active_seconds += 1;
        self.samples_since_flush += 1;
    }

    fn flush_due(&self) -> bool {
        self.samples_since_flush >= FLUSH_EVERY_SAMPLES
    }

    fn mark_flushed(&mut self) {
        self.samples_since_flush = 0;
    }

    fn as_usage(&self) -> DailyUsage {
        self.usage.clone()
    }
}

/// Samples counters once per second, folds the deltas into the current
/// day and persists the running totals every few samples.
pub struct UsageCollector {
    sampler: RateSampler,
    store: Arc<UsageStore>,
    broadcaster: Arc<SnapshotBroadcaster>,
    totals: DayTotals,
}

impl UsageCollector {
    /// Seeds the day bucket from the store so a restart the same day keeps
    /// accumulating where the previous run stopped.
    pub async fn new(
        sampler: RateSampler,
        store: Arc<UsageStore>,
        broadcaster: Arc<SnapshotBroadcaster>,
    ) -> Result<Self> {
        let today = Local::now().date_naive();
        let totals = match store.get_daily(today).await? {
            Some(row) => {
                info!(
                    "Resuming usage for {}: {} sent, {} received, {}s active",
                    today, row.bytes_sent, row.bytes_recv, row.active_seconds
                );
                DayTotals::resume(row)
            }
            None => DayTotals::starting(today),
        };

        Ok(Self {
            sampler,
            store,
            broadcaster,
            totals,
        })
    }

    pub fn start(self) -> CollectorHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(shutdown.child_token()));
        CollectorHandle { shutdown, task }
    }

    async fn run(mut self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Usage collector started for day {}", self.totals.usage.day);
        loop {
            tokio::select! {
                _ = interval.tick() => self.collect_once().await,
                _ = shutdown.cancelled() => break,
            }
        }

        // Totals not yet persisted would be lost here, so flush once more.
        self.flush(&self.totals.as_usage()).await;
        info!("Usage collector stopped");
    }

    async fn collect_once(&mut self) {
        let snapshot = match self.sampler.sample() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Skipping interval, counter read failed: {}", e);
                return;
            }
        };

        let today = Local::now().date_naive();
        if let Some(finished) = self.totals.rollover(today) {
            info!("Day rolled over from {} to {}", finished.day, today);
            self.flush(&finished).await;
        }

        self.totals.fold(&snapshot);
        self.broadcaster.publish(&snapshot);

        if self.totals.flush_due() {
            self.flush(&self.totals.as_usage()).await;
            self.totals.mark_flushed();
        }
    }

    /// Write failures are logged and swallowed. Totals are absolute, so the
    /// next successful flush covers everything a failed one missed.
    async fn flush(&self, usage: &DailyUsage) {
        if let Err(e) = self.store.upsert_daily(usage).await {
            warn!("Flush for {} failed: {}", usage.day, e);
        }
    }
}

pub struct CollectorHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl CollectorHandle {
    /// Stops the loop and waits for the final flush to complete.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            error!("Usage collector task failed: {}", e);
        }
    }
}
