use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-cache hit/miss/put/evict/expire counters (spec §2 item 4, §3
/// "CacheMetrics").
///
/// Atomics with `Relaxed` ordering, the same trade-off the teacher's
/// `CacheStats` makes: these are independent counters with no cross-field
/// invariant that needs a stronger ordering, so `Relaxed` gives the best
/// throughput under concurrent access.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// `hits / (hits + misses) * 100`, or `0.0` when there have been no
    /// accesses (spec §3: "derived hit rate").
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64 * 100.0
        }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.puts.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }

    /// Renders the counters (and the derived hit rate, multiplied by 100 and
    /// truncated to an integer so the map stays `u64`-valued) as a structured
    /// map, per spec §2 item 4 "renderable as a structured map".
    pub fn to_map(&self) -> HashMap<String, u64> {
        let mut map = HashMap::with_capacity(6);
        map.insert("hits".to_string(), self.hits());
        map.insert("misses".to_string(), self.misses());
        map.insert("puts".to_string(), self.puts());
        map.insert("evictions".to_string(), self.evictions());
        map.insert("expirations".to_string(), self.expirations());
        map.insert("hit_rate_pct".to_string(), self.hit_rate() as u64);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_with_no_accesses_is_zero() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_computed_from_hits_and_misses() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        assert!((metrics.hit_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn reset_zeroes_everything() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_put();
        metrics.record_eviction();
        metrics.reset();
        assert_eq!(metrics.hits(), 0);
        assert_eq!(metrics.puts(), 0);
        assert_eq!(metrics.evictions(), 0);
    }

    #[test]
    fn to_map_contains_all_counters() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        let map = metrics.to_map();
        assert_eq!(map.get("hits"), Some(&1));
        assert!(map.contains_key("hit_rate_pct"));
    }
}
