//! The declarative caching engine: timed, sized, policy-evicted storages
//! fronted by `Cacheable`/`CachePut`/`CacheEvict` descriptors and the
//! interceptor that dispatches a guarded call to the matching operation.

mod context;
mod descriptor;
mod entry;
mod error;
mod eviction;
mod events;
mod handler;
mod interceptor;
mod manager;
mod metrics;
mod operation;
mod resolver;
mod storage;

pub mod config;

pub use context::CacheOperationContext;
pub use descriptor::{CacheEvict, CachePut, Cacheable, InvocationCondition};
pub use entry::CacheEntry;
pub use error::CacheError;
pub use eviction::{EvictionCandidate, EvictionPolicy};
pub use events::{CacheEvent, CacheEventKind, EvictReason};
pub use handler::{CacheErrorHandler, SilentCacheErrorHandler, ThrowingCacheErrorHandler};
pub use interceptor::{CacheDescriptor, CacheInterceptor, InterceptorState};
pub use manager::{CacheFactory, CacheManager, SimpleCacheManager};
pub use metrics::CacheMetrics;
pub use operation::{CacheEvictOperation, CacheOutcome, CachePutOperation, CacheableOperation};
pub use resolver::{CacheResolver, CompositeCacheResolver};
pub use storage::{get_as, CacheStorage, InMemoryCacheStorage};
