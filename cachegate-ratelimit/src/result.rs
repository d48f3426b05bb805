use std::time::Duration;

use chrono::{DateTime, Utc};

/// The outcome of a [`crate::storage::RateLimitStorage::try_consume`] call
/// (spec §3 "RateLimitResult").
///
/// `current_count` is always capped at `limit` for reporting purposes (spec
/// §4.10 "Capping rule"), so `remaining_count` never goes negative even if
/// an implementation's internal counter briefly exceeds `limit`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitResult {
    pub identifier: String,
    pub limit_name: String,
    pub current_count: u64,
    pub limit: u64,
    pub window_secs: u64,
    pub reset_at: DateTime<Utc>,
    /// `0` when `allowed`; otherwise `max(0, reset_at - now)`.
    pub retry_after: Duration,
}

impl RateLimitResult {
    /// `limit - currentCount`, never negative (spec §3 "RateLimitResult").
    pub fn remaining_count(&self) -> u64 {
        self.limit.saturating_sub(self.current_count)
    }

    /// `currentCount < limit` (spec §3 "RateLimitResult").
    pub fn allowed(&self) -> bool {
        self.current_count < self.limit
    }
}
