use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request limiter keyed by caller identity.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    inner: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let hits = guard.entry(key.to_string()).or_default();

        hits.retain(|hit| now.duration_since(*hit) <= self.window);

        if hits.len() >= self.max_requests {
            return false;
        }

        hits.push(now);
        true
    }
}
