use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why an entry was evicted (spec §6 events table).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictReason {
    Manual,
    Policy,
}

/// The payload-specific half of a [`CacheEvent`] (spec §6 "Events": Hit,
/// Miss, Put, Evict, Expire, Clear).
#[derive(Clone, Debug, Serialize)]
#[serde(bound(serialize = "V: Serialize"))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheEventKind<V> {
    Hit { value: V },
    Miss,
    Put { value: V, ttl_secs: Option<u64> },
    Evict { reason: EvictReason },
    Expire { ttl_secs: Option<u64>, value: Option<V> },
    Clear { entries_cleared: u64 },
}

/// A published cache event. Carries `source` (the key), `name` (the cache
/// name), and `event_timestamp`, per spec §6.
#[derive(Clone, Debug, Serialize)]
#[serde(bound(serialize = "V: Serialize"))]
pub struct CacheEvent<V> {
    pub source: String,
    pub name: String,
    pub event_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: CacheEventKind<V>,
}

impl<V> CacheEvent<V> {
    pub fn new(source: impl Into<String>, name: impl Into<String>, at: DateTime<Utc>, kind: CacheEventKind<V>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            event_timestamp: at,
            kind,
        }
    }
}

pub(crate) fn ttl_secs(ttl: Option<Duration>) -> Option<u64> {
    ttl.map(|d| d.as_secs())
}
