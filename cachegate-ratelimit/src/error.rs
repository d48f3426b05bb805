use thiserror::Error;

/// The rate-limit-side error taxonomy (spec §7).
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Raised by the operation layer when a window's count exceeds its
    /// configured limit and `throw_on_exceeded` is set.
    #[error("rate limit exceeded on `{storage}`: {count}/{limit} requests in the current window")]
    LimitExceeded { storage: String, limit: u64, count: u64 },

    /// Raised by manager/resolver lookup when `fail_if_not_found` is set and
    /// no storage could be found or created under `name`.
    #[error("no rate limit storage named `{name}` could be found or created")]
    NoStorageFound { name: String },

    /// Any other failure raised by a storage operation; routed to the
    /// configured `RateLimitErrorHandler` and absorbed by default.
    #[error("transient failure in rate limit storage `{storage}`: {source}")]
    Transient {
        storage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
