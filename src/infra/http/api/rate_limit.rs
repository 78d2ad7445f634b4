use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Fixed-window request counter keyed by client.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Window>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut entry = self
            .buckets
            .entry(client.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(entry.started));
            return RateDecision::Limited { retry_after };
        }

        entry.count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    /// Drop windows that have fully elapsed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let window = self.window;
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.started) < window);
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_until_window_resets() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        assert_eq!(
            limiter.check_at("a", start),
            RateDecision::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.check_at("a", start),
            RateDecision::Allowed { remaining: 0 }
        );
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(20)),
            RateDecision::Limited {
                retry_after: Duration::from_secs(40)
            }
        );
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(60)),
            RateDecision::Allowed { remaining: 1 }
        );
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();
        assert!(matches!(
            limiter.check_at("a", now),
            RateDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("b", now),
            RateDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("a", now),
            RateDecision::Limited { .. }
        ));
    }
}
