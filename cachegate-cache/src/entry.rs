use std::time::Duration;

use chrono::{DateTime, Utc};
use cachegate_core::Clock;

/// A cached value plus its temporal and usage metadata (spec §3 "CacheEntry").
///
/// All reads within one call are consistent with a single time snapshot —
/// every method here that needs "now" takes the storage's [`Clock`] and calls
/// it exactly once.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    value: V,
    ttl: Option<Duration>,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    access_count: u64,
}

impl<V> CacheEntry<V> {
    /// Creates a fresh entry timestamped at `clock.now()`, with an access
    /// count of zero (spec §8: "accessCount is 1 after one successful get" —
    /// the count is incremented by [`Self::record_access`], not at creation).
    pub fn new(value: V, ttl: Option<Duration>, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            value,
            ttl,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.ttl
            .map(|ttl| self.created_at + chrono_duration(ttl))
    }

    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        match self.expires_at() {
            Some(expires_at) => clock.now() >= expires_at,
            None => false,
        }
    }

    /// `max(0, expiresAt - now)`, or `None` if the entry has no TTL.
    pub fn remaining_ttl(&self, clock: &dyn Clock) -> Option<Duration> {
        self.expires_at().map(|expires_at| {
            let remaining = expires_at - clock.now();
            remaining.to_std().unwrap_or(Duration::ZERO)
        })
    }

    pub fn age_ms(&self, clock: &dyn Clock) -> i64 {
        (clock.now() - self.created_at).num_milliseconds().max(0)
    }

    pub fn time_since_last_access_ms(&self, clock: &dyn Clock) -> i64 {
        (clock.now() - self.last_accessed_at)
            .num_milliseconds()
            .max(0)
    }

    /// Updates `last_accessed_at` and increments `access_count`. The only way
    /// `last_accessed_at`/`access_count` ever change after creation (spec §3
    /// "Lifecycle: ... mutated only via recordAccess").
    pub fn record_access(&mut self, clock: &dyn Clock) {
        self.last_accessed_at = clock.now();
        self.access_count = self.access_count.saturating_add(1);
    }
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachegate_core::FrozenClock;

    #[test]
    fn fresh_entry_has_zero_access_count_and_last_accessed_eq_created() {
        let clock = FrozenClock::starting_now();
        let entry = CacheEntry::new("v", None, &clock);
        assert_eq!(entry.access_count(), 0);
        assert_eq!(entry.last_accessed_at(), entry.created_at());
    }

    #[test]
    fn record_access_increments_and_bumps_last_accessed() {
        let clock = FrozenClock::starting_now();
        let mut entry = CacheEntry::new("v", None, &clock);
        clock.advance(Duration::from_millis(5));
        entry.record_access(&clock);
        assert_eq!(entry.access_count(), 1);
        assert!(entry.last_accessed_at() > entry.created_at());
    }

    #[test]
    fn expires_at_ttl_boundary() {
        let clock = FrozenClock::starting_now();
        let entry = CacheEntry::new("v", Some(Duration::from_secs(1)), &clock);
        assert!(!entry.is_expired(&clock));
        clock.advance(Duration::from_secs(1));
        assert!(entry.is_expired(&clock), "now >= expiresAt must count as expired");
    }

    #[test]
    fn zero_ttl_is_already_expired() {
        let clock = FrozenClock::starting_now();
        let entry = CacheEntry::new("v", Some(Duration::ZERO), &clock);
        assert!(entry.is_expired(&clock));
    }

    #[test]
    fn no_ttl_never_expires() {
        let clock = FrozenClock::starting_now();
        let entry = CacheEntry::new("v", None, &clock);
        clock.advance(Duration::from_secs(3600));
        assert!(!entry.is_expired(&clock));
        assert_eq!(entry.remaining_ttl(&clock), None);
    }

    #[test]
    fn remaining_ttl_counts_down() {
        let clock = FrozenClock::starting_now();
        let entry = CacheEntry::new("v", Some(Duration::from_secs(10)), &clock);
        clock.advance(Duration::from_secs(4));
        let remaining = entry.remaining_ttl(&clock).unwrap();
        assert_eq!(remaining, Duration::from_secs(6));
    }
}
