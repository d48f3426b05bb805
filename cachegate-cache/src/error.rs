use thiserror::Error;

/// The cache-side error taxonomy (spec §7).
#[derive(Debug, Error)]
pub enum CacheError {
    /// Signaled by `evict` when the key is absent. Swallowed by
    /// `evict_if_present`, which the operations layer uses by default
    /// (see `SPEC_FULL.md` Open Question 3).
    #[error("no such entry in cache `{cache}`")]
    NoSuchEntry { cache: String },

    /// Signaled by `put` when the storage is full, the key is new, and no
    /// eviction policy is configured.
    #[error("cache `{cache}` is at capacity ({max_entries} entries) and has no eviction policy")]
    CapacityExceeded { cache: String, max_entries: usize },

    /// Signaled by manager/resolver lookup when `fail_if_not_found` is set
    /// and no storage could be found or created under `name`.
    #[error("no cache named `{name}` could be found or created")]
    NoCacheFound { name: String },

    /// Any other failure raised by a storage operation; routed to the
    /// configured `CacheErrorHandler` and absorbed by default.
    #[error("transient failure in cache `{cache}`: {source}")]
    Transient {
        cache: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
