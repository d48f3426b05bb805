use chrono::{DateTime, Utc};
use serde::Serialize;

/// The rate-limit side of spec §6's events table: everything a
/// [`crate::storage::RateLimitStorage`] or [`crate::operation::RateLimitOperation`]
/// can report about one key in one window.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateLimitEventKind {
    /// A request was recorded against the window (storage-level; doesn't
    /// yet know whether it was allowed).
    Recorded { count: u64 },
    Allowed { count: u64, remaining: u64 },
    Denied { count: u64, limit: u64 },
    Reset,
    Rollback { count: u64 },
}

#[derive(Clone, Debug, Serialize)]
pub struct RateLimitEvent {
    pub source: String,
    pub name: String,
    pub event_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: RateLimitEventKind,
}

impl RateLimitEvent {
    pub fn new(source: impl Into<String>, name: impl Into<String>, at: DateTime<Utc>, kind: RateLimitEventKind) -> Self {
        Self { source: source.into(), name: name.into(), event_timestamp: at, kind }
    }
}
