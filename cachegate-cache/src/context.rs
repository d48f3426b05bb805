use std::sync::Arc;

use cachegate_core::{Key, MethodInvocation, SharedKeyGenerator};

use crate::descriptor::InvocationCondition;
use crate::handler::CacheErrorHandler;
use crate::resolver::CacheResolver;

/// Everything a [`crate::operation`] needs that isn't carried on the
/// descriptor itself: the current invocation, where to resolve caches from,
/// the fallback key generator, and how to react to storage failures (spec
/// §2 item 12 "CacheOperationContext").
pub struct CacheOperationContext<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub invocation: Arc<dyn MethodInvocation>,
    pub resolver: Arc<dyn CacheResolver<V>>,
    pub default_key_generator: SharedKeyGenerator,
    pub error_handler: Arc<dyn CacheErrorHandler>,
}

impl<V> CacheOperationContext<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(
        invocation: Arc<dyn MethodInvocation>,
        resolver: Arc<dyn CacheResolver<V>>,
        default_key_generator: SharedKeyGenerator,
        error_handler: Arc<dyn CacheErrorHandler>,
    ) -> Self {
        Self { invocation, resolver, default_key_generator, error_handler }
    }

    /// Generates a key using `key_generator` if the descriptor named one,
    /// falling back to [`Self::default_key_generator`] otherwise.
    pub async fn key_for(&self, key_generator: Option<&SharedKeyGenerator>) -> Key {
        match key_generator {
            Some(generator) => generator.generate(self.invocation.as_ref()).await,
            None => self.default_key_generator.generate(self.invocation.as_ref()).await,
        }
    }

    /// Evaluates `condition` against the current invocation, or returns
    /// `default` when the descriptor didn't name one.
    pub async fn evaluate(&self, condition: Option<&InvocationCondition>, default: bool) -> bool {
        match condition {
            Some(condition) => condition.should_apply(self.invocation.as_ref()).await,
            None => default,
        }
    }
}
