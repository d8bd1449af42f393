//! Sliding-window call budget shared across provider handles.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(60);

/// Per-minute call budget. `acquire` blocks the calling task until a slot is
/// free; the window slides, so bursts drain gradually instead of all at the
/// minute boundary.
pub struct RateLimiter {
    per_minute: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(per_minute: usize) -> Self {
        Self {
            per_minute: per_minute.max(1),
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a call slot is available, then claim it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();
                while let Some(&front) = stamps.front() {
                    if now.duration_since(front) >= WINDOW {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }
                if stamps.len() < self.per_minute {
                    stamps.push_back(now);
                    return;
                }
                // Oldest entry expiring opens the next slot.
                WINDOW - now.duration_since(*stamps.front().unwrap_or(&now))
            };
            debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Slots currently in use within the window.
    pub async fn in_flight(&self) -> usize {
        let mut stamps = self.timestamps.lock().await;
        let now = Instant::now();
        while let Some(&front) = stamps.front() {
            if now.duration_since(front) >= WINDOW {
                stamps.pop_front();
            } else {
                break;
            }
        }
        stamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn immediate_acquires_up_to_budget() {
        let limiter = RateLimiter::new(3);
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.in_flight().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_acquire_resumes_when_window_slides() {
        let limiter = RateLimiter::new(1);
        limiter.acquire().await;

        let acquired = tokio::spawn(async move {
            limiter.acquire().await;
            limiter
        });
        // Paused time auto-advances past the sleep inside acquire.
        let limiter = acquired.await.unwrap();
        assert_eq!(limiter.in_flight().await, 1);
    }
}
