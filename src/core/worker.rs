use std::net::IpAddr;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tokio::sync::mpsc::Receiver;
use tracing::{error, trace};

use crate::core::limiter::RateLimiter;
use crate::core::policy::{Resolution, RetryPolicy};
use crate::core::stats::Stats;
use crate::dns::{PtrLookup, ResolverSet};
use crate::output::OutputHandler;

pub type WorkQueue = Arc<Mutex<Receiver<IpAddr>>>;

/// One member of the resolution pool. Runs until the queue is closed and
/// drained; a failed address never stops it.
pub struct Worker<L: ?Sized, W> {
    pub id: usize,
    pub queue: WorkQueue,
    pub resolvers: Arc<ResolverSet>,
    pub lookup: Arc<L>,
    pub policy: RetryPolicy,
    pub limiter: Arc<RateLimiter>,
    pub stats: Arc<Stats>,
    pub output: Arc<OutputHandler<W>>,
}

impl<L, W> Worker<L, W>
where
    L: PtrLookup + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    /// Returns the number of addresses this worker handled.
    pub async fn run(self) -> u64 {
        let mut handled = 0;
        loop {
            let next = self.queue.lock().await.recv().await;
            let Some(address) = next else {
                break;
            };

            self.limiter.acquire().await;
            let resolution = self
                .policy
                .resolve(self.lookup.as_ref(), &self.resolvers, address)
                .await;

            match resolution {
                Resolution::Resolved(_) => self.stats.record_resolved(),
                Resolution::Failed => self.stats.record_failed(),
            }
            self.stats.record_processed();

            if let Err(e) = self.output.emit(address, &resolution).await {
                error!("Failed to write result for {}: {}", address, e);
            }
            handled += 1;
        }
        trace!("worker {} finished after {} addresses", self.id, handled);
        handled
    }
}
