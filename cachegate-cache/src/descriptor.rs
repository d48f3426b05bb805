use std::sync::Arc;
use std::time::Duration;

use cachegate_core::{Condition, MethodInvocation, SharedKeyGenerator};

/// A condition evaluated against the current invocation (spec §4.6
/// "condition"/"unless").
pub type InvocationCondition = Arc<dyn Condition<dyn MethodInvocation>>;

/// Declares that a method's return value should be served from, and written
/// back to, one or more caches (spec §2 item 8 "Cacheable").
#[derive(Clone)]
pub struct Cacheable {
    pub cache_names: Vec<String>,
    pub key_generator: Option<SharedKeyGenerator>,
    /// Evaluated before invocation; skips caching entirely (miss path always
    /// falls through to the underlying call) when it returns `false`.
    pub condition: Option<InvocationCondition>,
    /// Evaluated after invocation against the (about-to-be-cached) result;
    /// suppresses the write-back when it returns `true`.
    pub unless: Option<InvocationCondition>,
    pub ttl: Option<Duration>,
}

impl Cacheable {
    pub fn new(cache_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            cache_names: cache_names.into_iter().map(Into::into).collect(),
            key_generator: None,
            condition: None,
            unless: None,
            ttl: None,
        }
    }

    pub fn with_key_generator(mut self, key_generator: SharedKeyGenerator) -> Self {
        self.key_generator = Some(key_generator);
        self
    }

    pub fn with_condition(mut self, condition: InvocationCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_unless(mut self, unless: InvocationCondition) -> Self {
        self.unless = Some(unless);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Declares that a method's return value should always be written to one or
/// more caches, without first checking for a hit (spec §2 item 9
/// "CachePut").
#[derive(Clone)]
pub struct CachePut {
    pub cache_names: Vec<String>,
    pub key_generator: Option<SharedKeyGenerator>,
    pub condition: Option<InvocationCondition>,
    pub unless: Option<InvocationCondition>,
    pub ttl: Option<Duration>,
}

impl CachePut {
    pub fn new(cache_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            cache_names: cache_names.into_iter().map(Into::into).collect(),
            key_generator: None,
            condition: None,
            unless: None,
            ttl: None,
        }
    }

    pub fn with_key_generator(mut self, key_generator: SharedKeyGenerator) -> Self {
        self.key_generator = Some(key_generator);
        self
    }

    pub fn with_condition(mut self, condition: InvocationCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_unless(mut self, unless: InvocationCondition) -> Self {
        self.unless = Some(unless);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Declares that one or more cache entries should be removed around a method
/// call (spec §2 item 10 "CacheEvict").
#[derive(Clone)]
pub struct CacheEvict {
    pub cache_names: Vec<String>,
    pub key_generator: Option<SharedKeyGenerator>,
    pub condition: Option<InvocationCondition>,
    pub unless: Option<InvocationCondition>,
    /// Evict every entry in the named caches instead of a single key.
    pub all_entries: bool,
    /// Evict before the underlying call runs rather than after it succeeds.
    pub before_invocation: bool,
}

impl CacheEvict {
    pub fn new(cache_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            cache_names: cache_names.into_iter().map(Into::into).collect(),
            key_generator: None,
            condition: None,
            unless: None,
            all_entries: false,
            before_invocation: false,
        }
    }

    pub fn with_key_generator(mut self, key_generator: SharedKeyGenerator) -> Self {
        self.key_generator = Some(key_generator);
        self
    }

    pub fn with_condition(mut self, condition: InvocationCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_unless(mut self, unless: InvocationCondition) -> Self {
        self.unless = Some(unless);
        self
    }

    pub fn all_entries(mut self, all_entries: bool) -> Self {
        self.all_entries = all_entries;
        self
    }

    pub fn before_invocation(mut self, before_invocation: bool) -> Self {
        self.before_invocation = before_invocation;
        self
    }
}
