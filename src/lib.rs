//! # cachegate
//!
//! Declarative, annotation-driven caching and fixed-window rate-limiting
//! around method calls: pluggable storage, composable priority-ordered
//! resolvers, and attribute macros layered over a small set of async traits
//! (spec §1 "Purpose & scope").
//!
//! This crate is a facade: the real engines live in `cachegate_core`
//! (shared primitives — clock, conditions, key generation, event
//! publication, component registry), `cachegate_cache` (the caching
//! engine), and `cachegate_ratelimit` (the rate-limiting engine). Most
//! callers only need the attribute macros re-exported here plus
//! [`runtime()`] to reach the default in-process resolvers they wire
//! themselves to.
//!
//! ## Quick start
//!
//! ```ignore
//! use cachegate::{cacheable, CacheError};
//!
//! #[derive(Debug, thiserror::Error)]
//! enum MyError {
//!     #[error(transparent)]
//!     Cache(#[from] CacheError),
//! }
//!
//! struct Users;
//!
//! impl Users {
//!     #[cacheable(cache_names = ["users"], ttl_secs = 60)]
//!     async fn get(&self, id: u64) -> Result<String, MyError> {
//!         Ok(format!("user-{id}"))
//!     }
//! }
//! ```

pub use cachegate_cache::{
    CacheDescriptor, CacheEntry, CacheError, CacheErrorHandler, CacheEvent, CacheEventKind,
    CacheEvict, CacheFactory, CacheInterceptor, CacheManager, CacheMetrics, CacheOperationContext,
    CacheOutcome, CachePut, CacheResolver, CacheStorage, Cacheable, CompositeCacheResolver,
    EvictReason, EvictionCandidate, EvictionPolicy, InMemoryCacheStorage, InterceptorState as CacheInterceptorState,
    SilentCacheErrorHandler, SimpleCacheManager, ThrowingCacheErrorHandler,
};
pub use cachegate_core::{
    always, config, never, Clock, ComponentRegistry, Condition, DefaultKeyGenerator, FnCondition,
    FrozenClock, Key, KeyGenerator, MethodInvocation, MethodMetadata, NoopPublisher, Priority,
    Publish, SharedKeyGenerator, SimpleMethodInvocation, StaticComponentRegistry, SystemClock,
    Zone,
};
pub use cachegate_macros::{cache_evict, cache_put, cacheable, rate_limit};
pub use cachegate_ratelimit::{
    CompositeRateLimitResolver, InMemoryRateLimitStorage, InterceptorState as RateLimitInterceptorState,
    RateLimit, RateLimitEntry, RateLimitError, RateLimitErrorHandler, RateLimitEvent,
    RateLimitEventKind, RateLimitFactory, RateLimitInterceptor, RateLimitManager, RateLimitMetrics,
    RateLimitOperationContext, RateLimitOutcome, RateLimitResolver, RateLimitResult,
    SilentRateLimitErrorHandler, SimpleRateLimitManager, ThrowingRateLimitErrorHandler,
};

/// The default in-process runtime the `#[cacheable]`/`#[cache_put]`/
/// `#[cache_evict]`/`#[rate_limit]` macros wire themselves to when a call
/// site doesn't bring its own resolver: one `SystemClock`-driven, metrics-
/// and-events-enabled in-memory storage per named cache/rate limit,
/// auto-created on first use (spec §5 "no host DI container required").
///
/// Hosts that want a shared component registry across many annotated
/// methods — rather than the macros' own per-function `once_cell::sync::Lazy`
/// statics — can build one directly from [`StaticComponentRegistry`] and
/// hand the resolvers/managers it exposes to [`CacheOperationContext::new`]
/// / [`RateLimitOperationContext::new`] by hand; the macros are convenience
/// sugar over that same API, not the only way to use it.
pub struct DefaultRuntime;

impl DefaultRuntime {
    /// A fresh [`CacheFactory`] producing `SystemClock`-driven,
    /// `NoopPublisher`-backed in-memory storages, suitable for registering
    /// with a [`SimpleCacheManager`].
    pub fn cache_factory<V>() -> CacheFactory<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        std::sync::Arc::new(|name: &str| {
            let clock: std::sync::Arc<dyn Clock> = std::sync::Arc::new(SystemClock);
            std::sync::Arc::new(InMemoryCacheStorage::new(name, clock, std::sync::Arc::new(NoopPublisher::default())))
                as std::sync::Arc<dyn CacheStorage<V>>
        })
    }

    /// A fresh [`RateLimitFactory`] producing `SystemClock`-driven,
    /// `NoopPublisher`-backed in-memory storages, suitable for registering
    /// with a [`SimpleRateLimitManager`].
    pub fn rate_limit_factory() -> RateLimitFactory {
        std::sync::Arc::new(|name: &str| {
            let clock: std::sync::Arc<dyn Clock> = std::sync::Arc::new(SystemClock);
            std::sync::Arc::new(InMemoryRateLimitStorage::new(name, clock, std::sync::Arc::new(NoopPublisher::default())))
                as std::sync::Arc<dyn RateLimitStorage>
        })
    }
}

pub use cachegate_ratelimit::RateLimitStorage;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn default_cache_factory_round_trips_a_value() {
        let factory = DefaultRuntime::cache_factory::<String>();
        let storage = factory("users");
        storage.put("k".into(), "v".to_string(), None).await.unwrap();
        let entry = storage.get(&"k".into()).await.unwrap();
        assert_eq!(entry.map(|e| e.into_value()), Some("v".to_string()));
    }

    #[tokio::test]
    async fn default_rate_limit_factory_enforces_a_limit() {
        let factory = DefaultRuntime::rate_limit_factory();
        let storage: Arc<dyn RateLimitStorage> = factory("api");
        let key = "u:1".into();
        let first = storage.try_consume(&key, 1, 60).await.unwrap();
        let second = storage.try_consume(&key, 1, 60).await.unwrap();
        assert!(first.allowed());
        assert!(!second.allowed());
    }
}
