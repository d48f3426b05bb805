use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

/// A monotonic-enough wall-clock source all temporal math in the two engines
/// flows through.
///
/// Storages never call `Utc::now()`/`Instant::now()` directly — every TTL
/// check, window rollover, and event timestamp is derived from a `Clock`
/// handed to the storage at construction time. Tests substitute a
/// [`FrozenClock`] to exercise expiration and window-rollover scenarios
/// deterministically.
pub trait Clock: Send + Sync {
    /// Current instant, in UTC. Callers apply a [`Zone`] to render it.
    fn now(&self) -> DateTime<Utc>;
}

/// The default [`Clock`]: the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A [`Clock`] whose value is fixed until explicitly advanced.
///
/// Used in tests to deterministically cross TTL boundaries and rate-limit
/// window edges without sleeping.
pub struct FrozenClock {
    now: Mutex<DateTime<Utc>>,
}

impl FrozenClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Moves the clock forward by `d`. Storages observing this clock will
    /// see expirations / window resets the next time they call `now()`.
    pub fn advance(&self, d: Duration) {
        let mut guard = self.now.lock();
        *guard += chrono::Duration::from_std(d).expect("duration fits in chrono::Duration");
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A named timezone all timestamp rendering for a storage is pinned to.
///
/// Defaults to UTC. The zone only affects how instants are *rendered* and
/// how rate-limit window boundaries are *aligned*; the underlying instants
/// themselves are always computed in UTC.
#[derive(Clone, Copy, Debug)]
pub struct Zone(Tz);

impl Zone {
    pub fn utc() -> Self {
        Self(chrono_tz::UTC)
    }

    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses a zone identifier (e.g. `"UTC"`, `"Europe/Madrid"`). Unknown
    /// identifiers fall back to UTC rather than failing, matching the
    /// "default: UTC" contract of the `<prefix>.*.timezone` config key.
    pub fn parse(id: &str) -> Self {
        id.parse::<Tz>().map(Self).unwrap_or_else(|_| Self::utc())
    }

    pub fn tz(&self) -> Tz {
        self.0
    }

    pub fn localize(&self, at: DateTime<Utc>) -> DateTime<Tz> {
        at.with_timezone(&self.0)
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::utc()
    }
}
