use std::sync::Arc;

use cachegate_core::{Key, MethodInvocation, SharedKeyGenerator};

use crate::descriptor::InvocationCondition;
use crate::handler::RateLimitErrorHandler;
use crate::resolver::RateLimitResolver;

/// Everything a [`crate::interceptor::RateLimitInterceptor`] needs that
/// isn't carried on the descriptor itself — the rate-limit-side twin of
/// `cachegate_cache::CacheOperationContext` (spec §2 item 12 analogue).
pub struct RateLimitOperationContext {
    pub invocation: Arc<dyn MethodInvocation>,
    pub resolver: Arc<dyn RateLimitResolver>,
    pub default_key_generator: SharedKeyGenerator,
    pub error_handler: Arc<dyn RateLimitErrorHandler>,
}

impl RateLimitOperationContext {
    pub fn new(
        invocation: Arc<dyn MethodInvocation>,
        resolver: Arc<dyn RateLimitResolver>,
        default_key_generator: SharedKeyGenerator,
        error_handler: Arc<dyn RateLimitErrorHandler>,
    ) -> Self {
        Self { invocation, resolver, default_key_generator, error_handler }
    }

    pub async fn key_for(&self, key_generator: Option<&SharedKeyGenerator>) -> Key {
        match key_generator {
            Some(generator) => generator.generate(self.invocation.as_ref()).await,
            None => self.default_key_generator.generate(self.invocation.as_ref()).await,
        }
    }

    pub async fn evaluate(&self, condition: Option<&InvocationCondition>, default: bool) -> bool {
        match condition {
            Some(condition) => condition.should_apply(self.invocation.as_ref()).await,
            None => default,
        }
    }
}
