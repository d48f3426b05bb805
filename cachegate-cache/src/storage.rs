use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cachegate_core::{Clock, Key, Publish};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::events::{ttl_secs, CacheEvent, CacheEventKind, EvictReason};
use crate::eviction::{EvictionCandidate, EvictionPolicy};
use crate::metrics::CacheMetrics;

/// A named keyed store of [`CacheEntry`] values (spec §2 item 5, §4.3).
///
/// Every operation is logically atomic per key and asynchronous (spec §5:
/// "all storage and operation surfaces are asynchronous"); implementations
/// must await event publication before returning so observers can enforce
/// ordering.
#[async_trait]
pub trait CacheStorage<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str;

    /// Returns the entry iff present and not expired; an expired entry is
    /// removed and never served (spec §3 CacheStorage invariant).
    async fn get(&self, key: &Key) -> Result<Option<CacheEntry<V>>, CacheError>;

    async fn put(
        &self,
        key: Key,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<CacheEntry<V>, CacheError>;

    async fn put_if_absent(
        &self,
        key: Key,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<CacheEntry<V>, CacheError>;

    /// Fails with [`CacheError::NoSuchEntry`] if `key` is absent.
    async fn evict(&self, key: &Key) -> Result<(), CacheError>;

    /// As [`Self::evict`] but returns `true`/`false` without failing.
    async fn evict_if_present(&self, key: &Key) -> Result<bool, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    /// Scans and removes all expired entries.
    async fn invalidate(&self) -> Result<(), CacheError>;

    fn metrics(&self) -> &CacheMetrics;

    fn max_entries(&self) -> Option<usize>;

    fn eviction_policy(&self) -> Option<EvictionPolicy>;
}

/// `get` followed by a type conversion, standing in for the "external
/// conversion service" of spec §4.3's `getAs<T>` — kept as a free function
/// rather than a trait method so [`CacheStorage`] stays dyn-compatible.
pub async fn get_as<V, T, S>(storage: &S, key: &Key) -> Result<Option<T>, CacheError>
where
    V: Clone + Send + Sync + 'static,
    T: From<V>,
    S: CacheStorage<V> + ?Sized,
{
    Ok(storage.get(key).await?.map(|entry| T::from(entry.into_value())))
}

/// The default, in-process [`CacheStorage`]: a `DashMap` entry table with
/// configurable TTL, capacity, and eviction policy — the same pairing of a
/// lock-free concurrent map with a scored-eviction scan the teacher's
/// `GlobalCache`/`AsyncGlobalCache` use, generalized from per-function
/// statics to a named, runtime-constructed storage.
pub struct InMemoryCacheStorage<V>
where
    V: Clone + Send + Sync + 'static,
{
    name: String,
    entries: DashMap<Key, CacheEntry<V>>,
    max_entries: Option<usize>,
    default_ttl: Option<Duration>,
    eviction_policy: Option<EvictionPolicy>,
    clock: Arc<dyn Clock>,
    metrics: CacheMetrics,
    metrics_enabled: bool,
    events_enabled: bool,
    publisher: Arc<dyn Publish<CacheEvent<V>>>,
}

impl<V> InMemoryCacheStorage<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn Publish<CacheEvent<V>>>,
    ) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
            max_entries: None,
            default_ttl: None,
            eviction_policy: None,
            clock,
            metrics: CacheMetrics::new(),
            metrics_enabled: true,
            events_enabled: true,
            publisher,
        }
    }

    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_eviction_policy(mut self, policy: Option<EvictionPolicy>) -> Self {
        self.eviction_policy = policy;
        self
    }

    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    pub fn with_events_enabled(mut self, enabled: bool) -> Self {
        self.events_enabled = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn publish(&self, key: &Key, kind: CacheEventKind<V>) {
        if self.events_enabled {
            self.publisher
                .publish(CacheEvent::new(key.to_string(), self.name.clone(), self.now(), kind))
                .await;
        }
    }

    /// Scans the current entry table and asks the configured policy for a
    /// victim. `None` if no policy is configured or the table is empty.
    fn pick_victim(&self) -> Option<Key> {
        let policy = self.eviction_policy?;
        let snapshot: Vec<(Key, DateTime<Utc>, DateTime<Utc>, u64)> = self
            .entries
            .iter()
            .map(|r| {
                (
                    r.key().clone(),
                    r.value().created_at(),
                    r.value().last_accessed_at(),
                    r.value().access_count(),
                )
            })
            .collect();
        let candidates = snapshot.iter().map(|(k, created_at, last_accessed_at, access_count)| {
            EvictionCandidate {
                key: k,
                created_at: *created_at,
                last_accessed_at: *last_accessed_at,
                access_count: *access_count,
            }
        });
        policy.determine_eviction_candidate(candidates)
    }
}

#[async_trait]
impl<V> CacheStorage<V> for InMemoryCacheStorage<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &Key) -> Result<Option<CacheEntry<V>>, CacheError> {
        let hit_or_expired = self.entries.get_mut(key).map(|mut entry_ref| {
            if entry_ref.is_expired(self.clock.as_ref()) {
                None
            } else {
                entry_ref.record_access(self.clock.as_ref());
                Some(entry_ref.clone())
            }
        });

        match hit_or_expired {
            Some(Some(entry)) => {
                if self.metrics_enabled {
                    self.metrics.record_hit();
                }
                self.publish(key, CacheEventKind::Hit { value: entry.value().clone() }).await;
                Ok(Some(entry))
            }
            Some(None) => {
                if let Some((_, entry)) = self.entries.remove(key) {
                    if self.metrics_enabled {
                        self.metrics.record_eviction();
                        self.metrics.record_expiration();
                        self.metrics.record_miss();
                    }
                    if entry.ttl().is_some() {
                        let ttl = entry.ttl();
                        self.publish(
                            key,
                            CacheEventKind::Expire { ttl_secs: ttl_secs(ttl), value: Some(entry.into_value()) },
                        )
                        .await;
                    }
                    self.publish(key, CacheEventKind::Miss).await;
                }
                Ok(None)
            }
            None => {
                if self.metrics_enabled {
                    self.metrics.record_miss();
                }
                self.publish(key, CacheEventKind::Miss).await;
                Ok(None)
            }
        }
    }

    async fn put(&self, key: Key, value: V, ttl: Option<Duration>) -> Result<CacheEntry<V>, CacheError> {
        let effective_ttl = ttl.or(self.default_ttl);

        if let Some(max) = self.max_entries {
            let key_exists = self.entries.contains_key(&key);
            if !key_exists && self.entries.len() >= max {
                match self.pick_victim() {
                    Some(victim_key) => {
                        if self.entries.remove(&victim_key).is_some() {
                            if self.metrics_enabled {
                                self.metrics.record_eviction();
                            }
                            self.publish(&victim_key, CacheEventKind::Evict { reason: EvictReason::Policy })
                                .await;
                        }
                    }
                    None => {
                        return Err(CacheError::CapacityExceeded {
                            cache: self.name.clone(),
                            max_entries: max,
                        });
                    }
                }
            }
        }

        let entry = CacheEntry::new(value.clone(), effective_ttl, self.clock.as_ref());
        self.entries.insert(key.clone(), entry.clone());
        if self.metrics_enabled {
            self.metrics.record_put();
        }
        self.publish(&key, CacheEventKind::Put { value, ttl_secs: ttl_secs(effective_ttl) }).await;
        Ok(entry)
    }

    async fn put_if_absent(&self, key: Key, value: V, ttl: Option<Duration>) -> Result<CacheEntry<V>, CacheError> {
        if let Some(existing) = self.get(&key).await? {
            return Ok(existing);
        }
        self.put(key, value, ttl).await
    }

    async fn evict(&self, key: &Key) -> Result<(), CacheError> {
        match self.entries.remove(key) {
            Some(_) => {
                if self.metrics_enabled {
                    self.metrics.record_eviction();
                }
                self.publish(key, CacheEventKind::Evict { reason: EvictReason::Manual }).await;
                Ok(())
            }
            None => Err(CacheError::NoSuchEntry { cache: self.name.clone() }),
        }
    }

    async fn evict_if_present(&self, key: &Key) -> Result<bool, CacheError> {
        match self.evict(key).await {
            Ok(()) => Ok(true),
            Err(CacheError::NoSuchEntry { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let snapshot: Vec<(Key, u64)> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), r.value().access_count()))
            .collect();
        self.entries.clear();
        for (key, access_count) in &snapshot {
            self.publish(key, CacheEventKind::Clear { entries_cleared: *access_count }).await;
        }
        self.metrics.reset();
        Ok(())
    }

    async fn invalidate(&self) -> Result<(), CacheError> {
        let expired: Vec<Key> = self
            .entries
            .iter()
            .filter(|r| r.value().is_expired(self.clock.as_ref()))
            .map(|r| r.key().clone())
            .collect();

        for key in expired {
            if let Some((_, entry)) = self.entries.remove(&key) {
                if self.metrics_enabled {
                    self.metrics.record_eviction();
                    self.metrics.record_expiration();
                }
                if entry.ttl().is_some() {
                    let ttl = entry.ttl();
                    self.publish(&key, CacheEventKind::Expire { ttl_secs: ttl_secs(ttl), value: Some(entry.into_value()) })
                        .await;
                }
            }
        }
        Ok(())
    }

    fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    fn eviction_policy(&self) -> Option<EvictionPolicy> {
        self.eviction_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachegate_core::{FrozenClock, NoopPublisher};

    fn storage(clock: Arc<dyn Clock>) -> InMemoryCacheStorage<String> {
        InMemoryCacheStorage::new("users", clock, Arc::new(NoopPublisher::default()))
    }

    #[tokio::test]
    async fn read_through_hit_scenario() {
        // spec §8 scenario 1
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let cache = storage(clock).with_default_ttl(Some(Duration::from_secs(60)));

        cache.put("u:1".into(), "A".to_string(), None).await.unwrap();
        let entry = cache.get(&"u:1".into()).await.unwrap().unwrap();

        assert_eq!(entry.value(), "A");
        assert_eq!(cache.metrics().puts(), 1);
        assert_eq!(cache.metrics().hits(), 1);
        assert_eq!(cache.metrics().misses(), 0);
    }

    #[tokio::test]
    async fn expire_scenario() {
        // spec §8 scenario 2
        let clock = Arc::new(FrozenClock::starting_now());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let cache = storage(dyn_clock);

        cache.put("k".into(), 1i32.to_string(), Some(Duration::from_secs(1))).await.unwrap();
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.get(&"k".into()).await.unwrap(), None);
        assert_eq!(cache.metrics().evictions(), 1);
        assert_eq!(cache.metrics().expirations(), 1);
    }

    #[tokio::test]
    async fn lru_eviction_scenario() {
        // spec §8 scenario 3
        let clock = Arc::new(FrozenClock::starting_now());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let cache = InMemoryCacheStorage::new("x", dyn_clock, Arc::new(NoopPublisher::default()))
            .with_max_entries(Some(2))
            .with_eviction_policy(Some(EvictionPolicy::Lru));

        cache.put("a".into(), "1".into(), None).await.unwrap();
        clock.advance(Duration::from_millis(1));
        cache.put("b".into(), "2".into(), None).await.unwrap();
        clock.advance(Duration::from_millis(1));
        cache.get(&"a".into()).await.unwrap();
        clock.advance(Duration::from_millis(1));
        cache.put("c".into(), "3".into(), None).await.unwrap();

        assert!(cache.get(&"a".into()).await.unwrap().is_some());
        assert!(cache.get(&"c".into()).await.unwrap().is_some());
        assert!(cache.get(&"b".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_if_absent_keeps_first_value() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let cache = storage(clock);

        cache.put_if_absent("k".into(), "v1".into(), None).await.unwrap();
        cache.put_if_absent("k".into(), "v2".into(), None).await.unwrap();

        assert_eq!(cache.get(&"k".into()).await.unwrap().unwrap().value(), "v1");
    }

    #[tokio::test]
    async fn capacity_exceeded_without_policy() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let cache = InMemoryCacheStorage::new("x", clock, Arc::new(NoopPublisher::<CacheEvent<String>>::default()))
            .with_max_entries(Some(0));

        let err = cache.put("a".into(), "1".into(), None).await.unwrap_err();
        assert!(matches!(err, CacheError::CapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn evict_missing_key_fails_but_evict_if_present_does_not() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let cache = storage(clock);

        assert!(matches!(cache.evict(&"nope".into()).await, Err(CacheError::NoSuchEntry { .. })));
        assert_eq!(cache.evict_if_present(&"nope".into()).await.unwrap(), false);
    }

    #[tokio::test]
    async fn clear_resets_metrics_and_empties_map() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let cache = storage(clock);

        cache.put("a".into(), "1".into(), None).await.unwrap();
        cache.put("b".into(), "2".into(), None).await.unwrap();
        cache.get(&"a".into()).await.unwrap();

        cache.clear().await.unwrap();

        assert_eq!(cache.len(), 0);
        assert_eq!(cache.metrics().hits(), 0);
        assert_eq!(cache.metrics().puts(), 0);
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let clock = Arc::new(FrozenClock::starting_now());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let cache = storage(dyn_clock);

        cache.put("a".into(), "1".into(), Some(Duration::from_secs(1))).await.unwrap();
        clock.advance(Duration::from_secs(2));

        cache.invalidate().await.unwrap();
        cache.invalidate().await.unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn zero_ttl_put_is_immediately_expired_on_get() {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let cache = storage(clock);

        cache.put("k".into(), "v".into(), Some(Duration::ZERO)).await.unwrap();
        assert!(cache.get(&"k".into()).await.unwrap().is_none());
    }
}
