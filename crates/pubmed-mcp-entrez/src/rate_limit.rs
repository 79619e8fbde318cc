//! Courtesy pacing between E-utilities requests.
//!
//! NCBI allows 3 requests per second without an API key and 10 with one.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

pub const DEFAULT_RPS: u32 = 3;
pub const API_KEY_RPS: u32 = 10;

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn per_second(requests_per_second: u32) -> Self {
        let rps = requests_per_second.max(1);
        Self {
            min_interval: Duration::from_millis(1000 / rps as u64 + 1),
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the next request slot is free and claims it.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                trace!(wait_ms = (ready_at - now).as_millis() as u64, "Pacing E-utilities request");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
