use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-storage request/allow/deny/rollback counters (spec §3 "RateLimitMetrics").
#[derive(Debug, Default)]
pub struct RateLimitMetrics {
    requests: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    rollbacks: AtomicU64,
}

impl RateLimitMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_allowed(&self) {
        self.allowed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_denied(&self) {
        self.denied.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn allowed(&self) -> u64 {
        self.allowed.load(Ordering::Relaxed)
    }

    pub fn denied(&self) -> u64 {
        self.denied.load(Ordering::Relaxed)
    }

    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        self.denied.store(0, Ordering::Relaxed);
        self.rollbacks.store(0, Ordering::Relaxed);
    }

    pub fn to_map(&self) -> HashMap<String, u64> {
        let mut map = HashMap::with_capacity(4);
        map.insert("requests".to_string(), self.requests());
        map.insert("allowed".to_string(), self.allowed());
        map.insert("denied".to_string(), self.denied());
        map.insert("rollbacks".to_string(), self.rollbacks());
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = RateLimitMetrics::new();
        assert_eq!(metrics.requests(), 0);
        assert_eq!(metrics.to_map().get("denied"), Some(&0));
    }

    #[test]
    fn reset_zeroes_everything() {
        let metrics = RateLimitMetrics::new();
        metrics.record_request();
        metrics.record_denied();
        metrics.record_rollback();
        metrics.reset();
        assert_eq!(metrics.requests(), 0);
        assert_eq!(metrics.denied(), 0);
        assert_eq!(metrics.rollbacks(), 0);
    }
}
