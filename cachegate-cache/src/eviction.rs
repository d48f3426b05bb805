use chrono::{DateTime, Utc};

/// The subset of a [`crate::CacheEntry`]'s metadata an [`EvictionPolicy`]
/// needs to score a candidate, paired with its key. Storages build a
/// snapshot of these from their entry table and hand it to the configured
/// policy — the policy itself never touches the storage's lock.
pub struct EvictionCandidate<'a, K> {
    pub key: &'a K,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
}

/// Strategy choosing a victim key given the current entry table (spec §2
/// item 3, §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// First In, First Out — evicts the entry with the oldest `created_at`.
    Fifo,
    /// Least Recently Used — evicts the entry with the oldest `last_accessed_at`.
    Lru,
    /// Least Frequently Used — evicts the entry with the lowest `access_count`.
    Lfu,
}

impl EvictionPolicy {
    /// Returns `None` on an empty candidate set. Tie-breaks are deterministic
    /// given iteration order: the first minimal candidate encountered wins
    /// (spec §4.2 "Tie-breaks are unspecified but must be deterministic given
    /// iteration order").
    pub fn determine_eviction_candidate<'a, K: Clone>(
        &self,
        candidates: impl IntoIterator<Item = EvictionCandidate<'a, K>>,
    ) -> Option<K> {
        match self {
            EvictionPolicy::Fifo => candidates
                .into_iter()
                .min_by_key(|c| c.created_at)
                .map(|c| c.key.clone()),
            EvictionPolicy::Lru => candidates
                .into_iter()
                .min_by_key(|c| c.last_accessed_at)
                .map(|c| c.key.clone()),
            EvictionPolicy::Lfu => candidates
                .into_iter()
                .min_by_key(|c| c.access_count)
                .map(|c| c.key.clone()),
        }
    }
}

/// Case-insensitive parse matching the `<prefix>.cache.eviction-policy`
/// config key (`LRU|LFU|FIFO`); unrecognized values fall back to `None`
/// (spec §6: "default: absent" when unset or unrecognized).
impl std::str::FromStr for EvictionPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(EvictionPolicy::Fifo),
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candidate(key: &'static str, created_secs: i64, accessed_secs: i64, count: u64) -> EvictionCandidate<'static, &'static str> {
        let base = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        EvictionCandidate {
            key: Box::leak(Box::new(key)),
            created_at: base + Duration::seconds(created_secs),
            last_accessed_at: base + Duration::seconds(accessed_secs),
            access_count: count,
        }
    }

    #[test]
    fn empty_candidates_yield_none() {
        let empty: Vec<EvictionCandidate<'static, &str>> = vec![];
        assert_eq!(EvictionPolicy::Fifo.determine_eviction_candidate(empty), None);
    }

    #[test]
    fn fifo_picks_oldest_created() {
        let candidates = vec![
            candidate("a", 10, 10, 5),
            candidate("b", 1, 20, 1),
            candidate("c", 5, 5, 9),
        ];
        assert_eq!(EvictionPolicy::Fifo.determine_eviction_candidate(candidates), Some("b"));
    }

    #[test]
    fn lru_picks_oldest_last_accessed() {
        let candidates = vec![
            candidate("a", 10, 10, 5),
            candidate("b", 1, 20, 1),
            candidate("c", 5, 5, 9),
        ];
        assert_eq!(EvictionPolicy::Lru.determine_eviction_candidate(candidates), Some("c"));
    }

    #[test]
    fn lfu_picks_lowest_access_count() {
        let candidates = vec![
            candidate("a", 10, 10, 5),
            candidate("b", 1, 20, 1),
            candidate("c", 5, 5, 9),
        ];
        assert_eq!(EvictionPolicy::Lfu.determine_eviction_candidate(candidates), Some("b"));
    }

    #[test]
    fn from_str_is_case_insensitive_and_falls_back_to_err() {
        assert_eq!("lru".parse(), Ok(EvictionPolicy::Lru));
        assert_eq!("LFU".parse(), Ok(EvictionPolicy::Lfu));
        assert_eq!("FiFo".parse(), Ok(EvictionPolicy::Fifo));
        assert_eq!("nonsense".parse::<EvictionPolicy>(), Err(()));
    }
}
