use chrono::{DateTime, Timelike, Utc};

/// The state of one fixed window for one key (spec §3 "RateLimitEntry").
///
/// A window is identified by its `window_start`; once `now` reaches
/// `window_start + window_secs`, the window has elapsed and the next
/// request starts a fresh one with `count` reset to `1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitEntry {
    window_start: DateTime<Utc>,
    window_secs: u64,
    count: u64,
}

/// Aligns `now` to the window boundary spec §4.10 mandates: second
/// boundaries for windows of a minute or less, minute boundaries for
/// windows up to an hour, hour boundaries beyond that.
pub fn align_window_start(now: DateTime<Utc>, window_secs: u64) -> DateTime<Utc> {
    let truncated = if window_secs <= 60 {
        now.with_nanosecond(0)
    } else if window_secs <= 3_600 {
        now.with_second(0).and_then(|t| t.with_nanosecond(0))
    } else {
        now.with_minute(0).and_then(|t| t.with_second(0)).and_then(|t| t.with_nanosecond(0))
    };
    truncated.unwrap_or(now)
}

impl RateLimitEntry {
    /// `window_start` is aligned per [`align_window_start`] before being
    /// stored, regardless of what the caller passes in.
    pub fn new(window_start: DateTime<Utc>, window_secs: u64) -> Self {
        Self { window_start: align_window_start(window_start, window_secs), window_secs, count: 0 }
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        self.window_start + chrono::Duration::seconds(self.window_secs as i64)
    }

    /// `true` while `now` is still inside `[window_start, reset_at)`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        now < self.reset_at()
    }

    /// The only mutator besides rollback: bumps the count by one, saturating.
    pub fn record(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Best-effort undo of one [`Self::record`] call, saturating at zero.
    pub fn rollback(&mut self) {
        self.count = self.count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn fresh_window_has_zero_count() {
        let entry = RateLimitEntry::new(at(0), 60);
        assert_eq!(entry.count(), 0);
        assert_eq!(entry.reset_at(), at(60));
    }

    #[test]
    fn record_increments_and_rollback_undoes() {
        let mut entry = RateLimitEntry::new(at(0), 60);
        entry.record();
        entry.record();
        assert_eq!(entry.count(), 2);
        entry.rollback();
        assert_eq!(entry.count(), 1);
    }

    #[test]
    fn rollback_saturates_at_zero() {
        let mut entry = RateLimitEntry::new(at(0), 60);
        entry.rollback();
        assert_eq!(entry.count(), 0);
    }

    #[test]
    fn is_current_boundary() {
        let entry = RateLimitEntry::new(at(0), 60);
        assert!(entry.is_current(at(59)));
        assert!(!entry.is_current(at(60)), "now == resetAt must count as elapsed");
    }

    #[test]
    fn short_window_aligns_to_second_boundary() {
        let now = at(10) + chrono::Duration::milliseconds(500);
        let entry = RateLimitEntry::new(now, 30);
        assert_eq!(entry.window_start(), at(10));
    }

    #[test]
    fn medium_window_aligns_to_minute_boundary() {
        let now = at(125);
        let entry = RateLimitEntry::new(now, 300);
        assert_eq!(entry.window_start(), at(120));
    }

    #[test]
    fn long_window_aligns_to_hour_boundary() {
        let now = at(3_725);
        let entry = RateLimitEntry::new(now, 7_200);
        assert_eq!(entry.window_start(), at(3_600));
    }
}
