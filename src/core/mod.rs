use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;

use crate::args::Config;
use crate::dns::{PtrLookup, ResolverSet};
use crate::error::ScanError;
use crate::output::OutputHandler;

mod expand;
mod limiter;
mod policy;
mod stats;
mod worker;

pub use expand::{Expander, Target, TargetError};
pub use limiter::RateLimiter;
pub use policy::{LookupState, RETRY_BACKOFF, Resolution, RetryPolicy};
pub use stats::{PROGRESS_INTERVAL, ProgressReporter, Stats, StatsSnapshot};
pub use worker::{WorkQueue, Worker};

/// Hard cap on the worker pool.
pub const MAX_THREADS: usize = 10_000;

/// Knobs the resolution engine needs from the run configuration.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub threads: usize,
    pub timeout: Duration,
    pub retries: u32,
    pub domain_only: bool,
    pub show_failed: bool,
    pub rate_limit: u32,
    pub progress: bool,
    pub progress_interval: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            threads: 100,
            timeout: Duration::from_secs(2),
            retries: 1,
            domain_only: false,
            show_failed: false,
            rate_limit: 0,
            progress: false,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl From<&Config> for ScanSettings {
    fn from(config: &Config) -> Self {
        ScanSettings {
            threads: config.threads.clamp(1, MAX_THREADS),
            timeout: Duration::from_secs(config.timeout),
            retries: config.retries,
            domain_only: config.domain,
            show_failed: config.show_failed,
            rate_limit: config.rate_limit,
            progress: config.verbose,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl ScanSettings {
    /// Work queue capacity: enough to keep every worker fed.
    pub fn queue_capacity(&self) -> usize {
        self.threads.max(1) * 2
    }
}

#[derive(Debug)]
pub struct ScanSummary<W> {
    pub stats: StatsSnapshot,
    pub elapsed: Duration,
    pub output: W,
}

/// Bulk reverse resolver: expands input into addresses and resolves them on a
/// fixed pool of workers.
pub struct Scanner<L: ?Sized> {
    pub settings: ScanSettings,
    pub resolvers: Arc<ResolverSet>,
    pub lookup: Arc<L>,
}

impl<L> Scanner<L>
where
    L: PtrLookup + ?Sized + 'static,
{
    pub fn new(settings: ScanSettings, resolvers: ResolverSet, lookup: Arc<L>) -> Scanner<L> {
        Scanner {
            settings,
            resolvers: Arc::new(resolvers),
            lookup,
        }
    }

    /// Resolve every address described by `input`, writing results to
    /// `output`. Returns once the queue is drained and every worker exited.
    pub async fn exec<R, W>(&self, input: R, output: W) -> Result<ScanSummary<W>, ScanError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let start = Instant::now();
        let settings = &self.settings;
        let stats = Arc::new(Stats::new());

        let (tx, rx) = mpsc::channel(settings.queue_capacity());
        let queue: WorkQueue = Arc::new(Mutex::new(rx));
        let limiter = Arc::new(RateLimiter::new(settings.rate_limit));
        let output = Arc::new(OutputHandler::new(
            output,
            settings.domain_only,
            settings.show_failed,
        ));
        let policy = RetryPolicy::new(settings.retries, settings.timeout);

        let progress = settings
            .progress
            .then(|| ProgressReporter::spawn(stats.clone(), settings.progress_interval));

        let producer = tokio::spawn(Expander::new(tx, stats.clone()).feed(input));

        let mut workers = JoinSet::new();
        for id in 0..settings.threads.max(1) {
            let worker = Worker {
                id,
                queue: queue.clone(),
                resolvers: self.resolvers.clone(),
                lookup: self.lookup.clone(),
                policy,
                limiter: limiter.clone(),
                stats: stats.clone(),
                output: output.clone(),
            };
            workers.spawn(worker.run());
        }
        drop(queue);

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                failure.get_or_insert(ScanError::Task(e));
            }
        }
        match producer.await {
            Ok(Ok(produced)) => debug!("expander produced {} addresses", produced),
            Ok(Err(e)) => {
                failure.get_or_insert(ScanError::Input(e));
            }
            Err(e) => {
                failure.get_or_insert(ScanError::Task(e));
            }
        }

        if let Some(progress) = progress {
            progress.stop().await;
        }

        // Results already written must reach the sink even when the run fails.
        let flushed = match Arc::try_unwrap(output) {
            Ok(handler) => handler.finish().await.map_err(ScanError::Output),
            Err(_) => Err(ScanError::Output(io::Error::other("output still in use"))),
        };
        if let Some(e) = failure {
            return Err(e);
        }
        let output = flushed?;

        Ok(ScanSummary {
            stats: stats.snapshot(),
            elapsed: start.elapsed(),
            output,
        })
    }
}
