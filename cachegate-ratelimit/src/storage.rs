use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cachegate_core::{Clock, Key, Publish};
use dashmap::DashMap;

use crate::entry::RateLimitEntry;
use crate::error::RateLimitError;
use crate::events::{RateLimitEvent, RateLimitEventKind};
use crate::metrics::RateLimitMetrics;
use crate::result::RateLimitResult;

/// A named keyed store of fixed-window [`RateLimitEntry`] counters (spec §2
/// item 5, §4.10).
///
/// `record_request` never compares the resulting count against a limit —
/// limits are a property of the `RateLimit` descriptor, not the storage, so
/// the same storage can back descriptors with different limits (spec
/// `SPEC_FULL.md` Open Question 4). [`Self::try_consume`] is the
/// limit-enforcing counterpart operations call.
#[async_trait]
pub trait RateLimitStorage: Send + Sync {
    fn name(&self) -> &str;

    /// Records one request against `key`'s current window, starting a fresh
    /// window if the previous one elapsed. Returns the window's new state.
    /// Never checks `limit` — see the trait-level note.
    async fn record_request(&self, key: &Key, window_secs: u64) -> Result<RateLimitEntry, RateLimitError>;

    /// The current window for `key`, if one exists and hasn't elapsed.
    async fn current(&self, key: &Key) -> Result<Option<RateLimitEntry>, RateLimitError>;

    /// Checks `key`'s window against `limit`, incrementing only when under
    /// it, and returns the resulting [`RateLimitResult`] (spec §4.10
    /// `tryConsume`, steps 1-4).
    async fn try_consume(
        &self,
        key: &Key,
        limit: u64,
        window_secs: u64,
    ) -> Result<RateLimitResult, RateLimitError>;

    /// `limit - getRequestCount`, `0` if no current window exists (spec
    /// §4.10 `getRemainingRequests`).
    async fn remaining_requests(&self, key: &Key, limit: u64) -> Result<u64, RateLimitError>;

    /// `None` if there is no current window (spec §4.10 `getResetTime`).
    async fn reset_time(&self, key: &Key) -> Result<Option<chrono::DateTime<chrono::Utc>>, RateLimitError>;

    /// `Duration::ZERO` if there is no current window or it has already
    /// elapsed (spec §4.10 `getRetryAfter`).
    async fn retry_after(&self, key: &Key) -> Result<Duration, RateLimitError>;

    /// Removes every window tracked for `key` (spec §4.10 `reset(identifier)`).
    async fn reset(&self, key: &Key) -> Result<(), RateLimitError>;

    /// Best-effort undo of the last [`Self::try_consume`]/[`Self::record_request`]
    /// for `key`, if its window is still current (spec §4.11
    /// "RollbackCapableRateLimitStorage"). A no-op by default — storages
    /// that genuinely cannot decrement (e.g. an append-only remote counter)
    /// simply inherit this default instead of implementing a separate
    /// marker trait a caller would otherwise have to downcast to; see
    /// `DESIGN.md` for why this core favors a provided default method over
    /// a second trait object here.
    async fn rollback(&self, _key: &Key) {}

    /// Removes every expired window across every key, per spec §4.10
    /// `invalidate()`.
    async fn invalidate(&self) -> Result<(), RateLimitError>;

    /// Removes every window across every key, resetting metrics (spec §4.10
    /// `clear()`).
    async fn clear(&self) -> Result<(), RateLimitError>;

    fn metrics(&self) -> &RateLimitMetrics;
}

/// The default, in-process [`RateLimitStorage`]: a `DashMap` of
/// [`RateLimitEntry`] keyed by [`Key`], rolling windows over on expiry.
pub struct InMemoryRateLimitStorage {
    name: String,
    entries: DashMap<Key, RateLimitEntry>,
    clock: Arc<dyn Clock>,
    metrics: RateLimitMetrics,
    events_enabled: bool,
    publisher: Arc<dyn Publish<RateLimitEvent>>,
}

impl InMemoryRateLimitStorage {
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>, publisher: Arc<dyn Publish<RateLimitEvent>>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
            clock,
            metrics: RateLimitMetrics::new(),
            events_enabled: true,
            publisher,
        }
    }

    pub fn with_events_enabled(mut self, enabled: bool) -> Self {
        self.events_enabled = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    async fn publish(&self, key: &Key, kind: RateLimitEventKind) {
        if self.events_enabled {
            self.publisher
                .publish(RateLimitEvent::new(key.to_string(), self.name.clone(), self.clock.now(), kind))
                .await;
        }
    }

    fn retry_after_from(&self, reset_at: chrono::DateTime<chrono::Utc>) -> Duration {
        let now = self.clock.now();
        (reset_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

#[async_trait]
impl RateLimitStorage for InMemoryRateLimitStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn record_request(&self, key: &Key, window_secs: u64) -> Result<RateLimitEntry, RateLimitError> {
        let now = self.clock.now();
        let was_reset;
        let snapshot = {
            let mut slot = self.entries.entry(key.clone()).or_insert_with(|| RateLimitEntry::new(now, window_secs));
            was_reset = !slot.is_current(now);
            if was_reset {
                *slot = RateLimitEntry::new(now, window_secs);
            }
            slot.record();
            *slot
        };
        if was_reset {
            self.publish(key, RateLimitEventKind::Reset).await;
        }
        self.metrics.record_request();
        self.publish(key, RateLimitEventKind::Recorded { count: snapshot.count() }).await;
        Ok(snapshot)
    }

    async fn current(&self, key: &Key) -> Result<Option<RateLimitEntry>, RateLimitError> {
        let now = self.clock.now();
        Ok(self.entries.get(key).and_then(|entry| entry.is_current(now).then_some(*entry)))
    }

    async fn try_consume(
        &self,
        key: &Key,
        limit: u64,
        window_secs: u64,
    ) -> Result<RateLimitResult, RateLimitError> {
        let now = self.clock.now();

        // The whole decide-and-record step happens under one DashMap guard,
        // with no `.await` in between, so a concurrent reset/clear/invalidate
        // on this key can never observe (or race) a half-finished consume.
        let (was_reset, allowed, snapshot) = {
            let mut slot = self.entries.entry(key.clone()).or_insert_with(|| RateLimitEntry::new(now, window_secs));
            let was_reset = !slot.is_current(now);
            if was_reset {
                *slot = RateLimitEntry::new(now, window_secs);
            }
            let allowed = slot.count() < limit;
            if allowed {
                slot.record();
            }
            (was_reset, allowed, *slot)
        };

        if was_reset {
            self.publish(key, RateLimitEventKind::Reset).await;
        }

        if allowed {
            self.metrics.record_request();
            self.metrics.record_allowed();
            self.publish(
                key,
                RateLimitEventKind::Allowed { count: snapshot.count(), remaining: limit.saturating_sub(snapshot.count()) },
            )
            .await;

            Ok(RateLimitResult {
                identifier: key.to_string(),
                limit_name: self.name.clone(),
                current_count: snapshot.count().min(limit),
                limit,
                window_secs,
                reset_at: snapshot.reset_at(),
                retry_after: Duration::ZERO,
            })
        } else {
            self.metrics.record_request();
            self.metrics.record_denied();
            self.publish(key, RateLimitEventKind::Denied { count: snapshot.count(), limit }).await;

            Ok(RateLimitResult {
                identifier: key.to_string(),
                limit_name: self.name.clone(),
                current_count: snapshot.count().min(limit),
                limit,
                window_secs,
                reset_at: snapshot.reset_at(),
                retry_after: self.retry_after_from(snapshot.reset_at()),
            })
        }
    }

    async fn remaining_requests(&self, key: &Key, limit: u64) -> Result<u64, RateLimitError> {
        let count = self.current(key).await?.map(|entry| entry.count()).unwrap_or(0);
        Ok(limit.saturating_sub(count))
    }

    async fn reset_time(&self, key: &Key) -> Result<Option<chrono::DateTime<chrono::Utc>>, RateLimitError> {
        Ok(self.current(key).await?.map(|entry| entry.reset_at()))
    }

    async fn retry_after(&self, key: &Key) -> Result<Duration, RateLimitError> {
        match self.current(key).await? {
            Some(entry) => Ok(self.retry_after_from(entry.reset_at())),
            None => Ok(Duration::ZERO),
        }
    }

    async fn reset(&self, key: &Key) -> Result<(), RateLimitError> {
        self.entries.remove(key);
        self.publish(key, RateLimitEventKind::Reset).await;
        Ok(())
    }

    async fn rollback(&self, key: &Key) {
        let now = self.clock.now();
        let count = {
            let mut slot = match self.entries.get_mut(key) {
                Some(slot) => slot,
                None => return,
            };
            if !slot.is_current(now) {
                return;
            }
            slot.rollback();
            slot.count()
        };
        self.metrics.record_rollback();
        self.publish(key, RateLimitEventKind::Rollback { count }).await;
    }

    async fn invalidate(&self) -> Result<(), RateLimitError> {
        let now = self.clock.now();
        let expired: Vec<Key> = self
            .entries
            .iter()
            .filter(|r| !r.value().is_current(now))
            .map(|r| r.key().clone())
            .collect();

        for key in expired {
            if self.entries.remove(&key).is_some() {
                self.publish(&key, RateLimitEventKind::Reset).await;
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), RateLimitError> {
        let snapshot: Vec<Key> = self.entries.iter().map(|r| r.key().clone()).collect();
        self.entries.clear();
        for key in &snapshot {
            self.publish(key, RateLimitEventKind::Reset).await;
        }
        self.metrics.reset();
        Ok(())
    }

    fn metrics(&self) -> &RateLimitMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachegate_core::{FrozenClock, NoopPublisher};
    use std::time::Duration as StdDuration;

    fn storage(clock: Arc<dyn Clock>) -> InMemoryRateLimitStorage {
        InMemoryRateLimitStorage::new("api", clock, Arc::new(NoopPublisher::default()))
    }

    #[tokio::test]
    async fn records_increment_count_within_window() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let storage = storage(clock);

        storage.record_request(&"k".into(), 60).await.unwrap();
        let second = storage.record_request(&"k".into(), 60).await.unwrap();

        assert_eq!(second.count(), 2);
        assert_eq!(storage.metrics().requests(), 2);
    }

    #[tokio::test]
    async fn window_rolls_over_after_elapsing() {
        let clock = Arc::new(FrozenClock::starting_now());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let storage = storage(dyn_clock);

        storage.record_request(&"k".into(), 1).await.unwrap();
        clock.advance(StdDuration::from_secs(2));
        let entry = storage.record_request(&"k".into(), 1).await.unwrap();

        assert_eq!(entry.count(), 1, "new window should restart the count");
    }

    #[tokio::test]
    async fn rollback_undoes_last_record() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let storage = storage(clock);

        storage.record_request(&"k".into(), 60).await.unwrap();
        storage.record_request(&"k".into(), 60).await.unwrap();
        storage.rollback(&"k".into()).await;

        let current = storage.current(&"k".into()).await.unwrap().unwrap();
        assert_eq!(current.count(), 1);
        assert_eq!(storage.metrics().rollbacks(), 1);
    }

    #[tokio::test]
    async fn rollback_on_elapsed_window_is_a_noop() {
        let clock = Arc::new(FrozenClock::starting_now());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let storage = storage(dyn_clock);

        storage.record_request(&"k".into(), 1).await.unwrap();
        clock.advance(StdDuration::from_secs(2));
        storage.rollback(&"k".into()).await;

        assert_eq!(storage.metrics().rollbacks(), 0);
    }

    #[tokio::test]
    async fn reset_clears_the_window() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let storage = storage(clock);

        storage.record_request(&"k".into(), 60).await.unwrap();
        storage.reset(&"k".into()).await.unwrap();

        assert_eq!(storage.current(&"k".into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn try_consume_allows_up_to_limit_then_denies() {
        // spec §8 scenario 4
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let storage = storage(clock);
        let key: Key = "u:1".into();

        let first = storage.try_consume(&key, 2, 60).await.unwrap();
        let second = storage.try_consume(&key, 2, 60).await.unwrap();
        let third = storage.try_consume(&key, 2, 60).await.unwrap();

        assert!(first.allowed());
        assert!(second.allowed());
        assert!(!third.allowed());
        assert_eq!(third.current_count, 2);
        assert_eq!(third.remaining_count(), 0);
        assert!(third.retry_after > StdDuration::ZERO && third.retry_after <= StdDuration::from_secs(60));
    }

    #[tokio::test]
    async fn try_consume_result_is_capped_at_limit() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let storage = storage(clock);
        let key: Key = "u:1".into();

        for _ in 0..5 {
            storage.try_consume(&key, 1, 60).await.unwrap();
        }
        let result = storage.try_consume(&key, 1, 60).await.unwrap();
        assert_eq!(result.current_count, 1);
        assert_eq!(result.remaining_count(), 0);
    }

    #[tokio::test]
    async fn invalidate_sweeps_expired_windows() {
        let clock = Arc::new(FrozenClock::starting_now());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let storage = storage(dyn_clock);

        storage.record_request(&"k".into(), 1).await.unwrap();
        clock.advance(StdDuration::from_secs(2));

        storage.invalidate().await.unwrap();
        storage.invalidate().await.unwrap();
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn clear_resets_metrics_and_empties_map() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let storage = storage(clock);

        storage.record_request(&"a".into(), 60).await.unwrap();
        storage.record_request(&"b".into(), 60).await.unwrap();

        storage.clear().await.unwrap();

        assert_eq!(storage.len(), 0);
        assert_eq!(storage.metrics().requests(), 0);
    }
}
