//! Per-address resolution policy.
//!
//! Resolvers are tried in list order; each one gets `retries + 1` attempts
//! separated by a fixed backoff before the next resolver is consulted. The
//! first attempt that returns at least one hostname wins.

use std::net::IpAddr;
use std::time::Duration;

use tracing::debug;

use crate::dns::{Attempt, PtrLookup, ResolverSet};
use crate::error::LookupError;

pub const RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupState {
    /// First attempt against resolver `i`.
    TryResolver(usize),
    /// Attempt number `k` (1-based retry index) against resolver `i`.
    Retry(usize, u32),
    Success(Vec<String>),
    Failed,
}

/// Final outcome for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Vec<String>),
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, timeout: Duration) -> Self {
        Self {
            retries,
            timeout,
            backoff: RETRY_BACKOFF,
        }
    }

    pub fn start(&self, resolvers: usize) -> LookupState {
        if resolvers == 0 {
            LookupState::Failed
        } else {
            LookupState::TryResolver(0)
        }
    }

    /// Transition after attempt `retry` against resolver `resolver` finished
    /// with `outcome`.
    pub fn advance(
        &self,
        resolver: usize,
        retry: u32,
        resolvers: usize,
        outcome: Result<Vec<String>, LookupError>,
    ) -> LookupState {
        match outcome {
            Ok(names) if !names.is_empty() => LookupState::Success(names),
            _ if retry < self.retries => LookupState::Retry(resolver, retry + 1),
            _ if resolver + 1 < resolvers => LookupState::TryResolver(resolver + 1),
            _ => LookupState::Failed,
        }
    }

    /// Drive the state machine for `address` until it succeeds or every
    /// resolver has been exhausted.
    pub async fn resolve<L>(&self, lookup: &L, resolvers: &ResolverSet, address: IpAddr) -> Resolution
    where
        L: PtrLookup + ?Sized,
    {
        let mut state = self.start(resolvers.len());
        loop {
            let (resolver, retry) = match state {
                LookupState::TryResolver(i) => (i, 0),
                LookupState::Retry(i, k) => {
                    tokio::time::sleep(self.backoff).await;
                    (i, k)
                }
                LookupState::Success(names) => return Resolution::Resolved(names),
                LookupState::Failed => return Resolution::Failed,
            };

            let Some(endpoint) = resolvers.get(resolver) else {
                return Resolution::Failed;
            };
            let attempt = Attempt {
                address,
                endpoint,
                retry,
                timeout: self.timeout,
            };
            let outcome = lookup.lookup(&attempt).await;
            if let Err(e) = &outcome {
                debug!("{} via {} (try {}): {}", address, endpoint, retry, e);
            }
            state = self.advance(resolver, retry, resolvers.len(), outcome);
        }
    }
}
