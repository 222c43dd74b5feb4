use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::info;

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Run-wide counters shared by the expander, the workers and the progress
/// reporter. Each counter is atomic on its own; the four are not updated as a
/// single transaction, so they only agree exactly once the run is quiescent.
#[derive(Debug, Default)]
pub struct Stats {
    total: AtomicU64,
    resolved: AtomicU64,
    failed: AtomicU64,
    processed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub total: u64,
    pub resolved: u64,
    pub failed: u64,
    pub processed: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolved(&self) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Release);
    }

    /// `processed` is read first so the later `total` read covers every
    /// address it counts: `processed <= total` holds in every snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        let processed = self.processed.load(Ordering::Acquire);
        StatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            processed,
        }
    }
}

impl StatsSnapshot {
    /// Processed addresses per second over `elapsed`.
    pub fn rate(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Handle to a running progress reporter. Dropping it without calling
/// [`ProgressReporter::stop`] also ends the task.
pub struct ProgressReporter {
    done: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    pub fn spawn(stats: Arc<Stats>, period: Duration) -> Self {
        let (done, mut rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let mut ticker = interval_at(start + period, period);
            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    _ = ticker.tick() => {
                        let snapshot = stats.snapshot();
                        info!(
                            "Progress: {}/{} processed, {} resolved, {:.1} IPs/sec",
                            snapshot.processed,
                            snapshot.total,
                            snapshot.resolved,
                            snapshot.rate(start.elapsed()),
                        );
                    }
                }
            }
        });
        Self { done, handle }
    }

    pub async fn stop(self) {
        let _ = self.done.send(());
        let _ = self.handle.await;
    }
}
