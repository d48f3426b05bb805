use std::future::Future;

use tracing::debug;

use crate::context::CacheOperationContext;
use crate::descriptor::{CacheEvict, CachePut, Cacheable};
use crate::error::CacheError;
use crate::operation::{CacheEvictOperation, CacheOutcome, CachePutOperation, CacheableOperation};

/// Which kind of cache annotation a [`CacheInterceptor`] was built for
/// (spec §2 item 13 "CacheInterceptor"). A join point carries exactly one of
/// these — combining more than one on the same method is outside this
/// crate's scope, matching the direct (non-composable) annotation discovery
/// `cachegate_core::MethodInvocation::direct_annotation` exposes.
pub enum CacheDescriptor {
    Cacheable(Cacheable),
    CachePut(CachePut),
    CacheEvict(CacheEvict),
}

/// The phases a guarded call passes through. Exposed for observability
/// (logged via `tracing`) rather than branched on externally — the
/// transitions themselves live in [`crate::operation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterceptorState {
    /// Evaluating `condition`/`unless` and resolving target caches.
    Evaluating,
    /// Checking caches for a hit (`Cacheable`) or running the underlying call.
    Invoking,
    /// Writing back or evicting entries after the underlying call.
    Committing,
    Done,
}

/// Dispatches a guarded call to the operation matching its descriptor,
/// logging the high-level phase transitions a reader can follow without the
/// per-cache detail each operation emits as metrics/events.
pub struct CacheInterceptor {
    descriptor: CacheDescriptor,
}

impl CacheInterceptor {
    pub fn new(descriptor: CacheDescriptor) -> Self {
        Self { descriptor }
    }

    pub async fn intercept<V, F, Fut, E>(&self, ctx: &CacheOperationContext<V>, invoke: F) -> Result<V, CacheOutcome<E>>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        debug!(state = ?InterceptorState::Evaluating, "entering cache interceptor");
        let result = match &self.descriptor {
            CacheDescriptor::Cacheable(descriptor) => CacheableOperation.execute(descriptor, ctx, invoke).await,
            CacheDescriptor::CachePut(descriptor) => CachePutOperation.execute(descriptor, ctx, invoke).await,
            CacheDescriptor::CacheEvict(descriptor) => CacheEvictOperation.execute(descriptor, ctx, invoke).await,
        };
        debug!(state = ?InterceptorState::Done, ok = result.is_ok(), "cache interceptor finished");
        result
    }
}
