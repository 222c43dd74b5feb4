use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Shared pacing gate: one permit every `1/N` seconds across all workers.
pub struct RateLimiter {
    ticker: Option<Mutex<Interval>>,
}

impl RateLimiter {
    /// `per_second == 0` disables limiting. Must be called inside a tokio
    /// runtime.
    pub fn new(per_second: u32) -> Self {
        if per_second == 0 {
            return Self::disabled();
        }
        let period = (Duration::from_secs(1) / per_second).max(Duration::from_nanos(1));
        let mut ticker = interval(period);
        // A late worker gets one pending permit, not a burst of missed ones.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            ticker: Some(Mutex::new(ticker)),
        }
    }

    pub fn disabled() -> Self {
        Self { ticker: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.ticker.is_some()
    }

    /// Wait for the next permit. Returns immediately when disabled.
    pub async fn acquire(&self) {
        if let Some(ticker) = &self.ticker {
            ticker.lock().await.tick().await;
        }
    }
}
