use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter: at most `max_requests` per `window`.
///
/// Clones share the same window, so one limiter can guard several clients
/// talking to the same host.
#[derive(Clone)]
pub struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for a market data slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_window_when_full() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let started = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_secs(1));

        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_zero_limit_is_treated_as_one() {
        let limiter = RateLimiter::new(0, Duration::from_millis(10));
        limiter.acquire().await;
    }
}
