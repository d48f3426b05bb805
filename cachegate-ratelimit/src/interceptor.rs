use std::future::Future;

use tracing::debug;

use crate::context::RateLimitOperationContext;
use crate::descriptor::RateLimit;
use crate::operation::{RateLimitOperation, RateLimitOutcome};

/// The phases a rate-limit-guarded call passes through, exposed for
/// observability the same way `cachegate_cache::InterceptorState` is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterceptorState {
    /// Evaluating `condition`/`unless` and resolving target storages.
    Evaluating,
    /// Consuming one request against every resolved storage.
    Consuming,
    /// Running the underlying call.
    Invoking,
    Done,
}

/// Dispatches a guarded call through [`RateLimitOperation`], logging the
/// high-level phase transitions (spec §4.14 "RateLimitInterceptor").
pub struct RateLimitInterceptor {
    descriptor: RateLimit,
}

impl RateLimitInterceptor {
    pub fn new(descriptor: RateLimit) -> Self {
        Self { descriptor }
    }

    pub async fn intercept<T, F, Fut, E>(
        &self,
        ctx: &RateLimitOperationContext,
        invoke: F,
    ) -> Result<T, RateLimitOutcome<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        debug!(state = ?InterceptorState::Evaluating, "entering rate limit interceptor");
        let result = RateLimitOperation.execute(&self.descriptor, ctx, invoke).await;
        debug!(state = ?InterceptorState::Done, ok = result.is_ok(), "rate limit interceptor finished");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RateLimitError;
    use crate::handler::SilentRateLimitErrorHandler;
    use crate::manager::{RateLimitFactory, SimpleRateLimitManager};
    use crate::resolver::CompositeRateLimitResolver;
    use crate::storage::{InMemoryRateLimitStorage, RateLimitStorage};
    use cachegate_core::{Clock, DefaultKeyGenerator, FrozenClock, NoopPublisher, Priority, SimpleMethodInvocation};
    use std::sync::Arc;

    fn ctx() -> RateLimitOperationContext {
        let factory: RateLimitFactory = Arc::new(|name: &str| {
            let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
            Arc::new(InMemoryRateLimitStorage::new(name, clock, Arc::new(NoopPublisher::default()))) as Arc<dyn RateLimitStorage>
        });
        let manager = Arc::new(SimpleRateLimitManager::new(factory));
        let mut resolver = CompositeRateLimitResolver::new(false);
        resolver.add_manager(Priority::Highest(0), manager);
        RateLimitOperationContext::new(
            Arc::new(SimpleMethodInvocation::new("Svc", "m", vec!["1".into()])),
            Arc::new(resolver),
            Arc::new(DefaultKeyGenerator),
            Arc::new(SilentRateLimitErrorHandler),
        )
    }

    #[tokio::test]
    async fn second_call_over_the_limit_is_denied() {
        let ctx = ctx();
        let interceptor = RateLimitInterceptor::new(RateLimit::new(["api"], 1, 60));

        interceptor.intercept(&ctx, || async { Ok::<_, RateLimitError>(()) }).await.unwrap();
        let second = interceptor.intercept(&ctx, || async { Ok::<_, RateLimitError>(()) }).await;

        assert!(matches!(second, Err(RateLimitOutcome::Exceeded(_))));
    }
}
