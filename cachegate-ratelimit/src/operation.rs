use std::future::Future;
use std::sync::Arc;

use cachegate_core::Key;

use crate::context::RateLimitOperationContext;
use crate::descriptor::RateLimit;
use crate::error::RateLimitError;
use crate::result::RateLimitResult;
use crate::storage::RateLimitStorage;

/// Why a guarded call did not produce the underlying call's own result
/// (spec §4.14 "RateLimitInterceptor").
#[derive(Debug)]
pub enum RateLimitOutcome<E> {
    /// A storage denied the request and `throw_on_exceeded` was set; the
    /// guarded call was never invoked.
    Exceeded(RateLimitResult),
    /// A storage denied the request and `throw_on_exceeded` was unset (spec
    /// §4.14 step 3's "return control without invoking the target method");
    /// the guarded call was never invoked, but this is not treated as a
    /// hard failure the way [`Self::Exceeded`] is.
    Skipped(RateLimitResult),
    /// A storage/resolver operation itself failed and the configured
    /// `RateLimitErrorHandler` re-raised it (spec lines 260/266: a missing
    /// storage or a transient failure is a distinct signal from an exceeded
    /// limit, not a denial).
    RateLimit(RateLimitError),
    /// The guarded call ran and failed on its own terms.
    Inner(E),
}

impl<E> From<RateLimitError> for RateLimitOutcome<E> {
    fn from(err: RateLimitError) -> Self {
        RateLimitOutcome::RateLimit(err)
    }
}

fn resolve_all(
    ctx: &RateLimitOperationContext,
    names: &[String],
) -> Result<Vec<Arc<dyn RateLimitStorage>>, RateLimitError> {
    let mut storages = Vec::with_capacity(names.len());
    for name in names {
        match ctx.resolver.resolve_or_create(name) {
            Ok(storage) => storages.push(storage),
            Err(err) => ctx.error_handler.handle(err)?,
        }
    }
    Ok(storages)
}

/// Best-effort reverse-order undo of every storage that already recorded a
/// consumption for this call (spec §4.11 "Rollback").
async fn rollback_all(successes: &[Arc<dyn RateLimitStorage>], key: &Key) {
    for storage in successes.iter().rev() {
        storage.rollback(key).await;
    }
}

/// Executes a `RateLimit`-guarded call: consumes one request against every
/// named storage, rolling back everything already consumed on the first
/// denial, then either short-circuits or invokes the underlying call
/// depending on `throw_on_exceeded` (spec §4.10, §4.11, §4.14).
pub struct RateLimitOperation;

impl RateLimitOperation {
    pub async fn execute<T, F, Fut, E>(
        &self,
        descriptor: &RateLimit,
        ctx: &RateLimitOperationContext,
        invoke: F,
    ) -> Result<T, RateLimitOutcome<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if ctx.evaluate(descriptor.unless.as_ref(), false).await {
            return invoke().await.map_err(RateLimitOutcome::Inner);
        }
        if !ctx.evaluate(descriptor.condition.as_ref(), true).await {
            return invoke().await.map_err(RateLimitOutcome::Inner);
        }

        let key = ctx.key_for(descriptor.key_generator.as_ref()).await;
        let storages = resolve_all(ctx, &descriptor.storage_names).map_err(RateLimitOutcome::RateLimit)?;

        let mut successes = Vec::with_capacity(storages.len());
        for storage in &storages {
            let consumed = storage
                .try_consume(&key, descriptor.limit, descriptor.window_secs)
                .await;
            let result = match consumed {
                Ok(result) => result,
                Err(err) => {
                    // The storage operation itself failed — a distinct signal
                    // from an exceeded limit. Let the configured handler
                    // decide: silent handlers fail open (skip this storage
                    // and keep going), throwing handlers abort the call.
                    if let Err(err) = ctx.error_handler.handle(err) {
                        rollback_all(&successes, &key).await;
                        return Err(RateLimitOutcome::RateLimit(err));
                    }
                    continue;
                }
            };

            if result.allowed() {
                successes.push(storage.clone());
                continue;
            }

            rollback_all(&successes, &key).await;
            return Err(if descriptor.throw_on_exceeded {
                RateLimitOutcome::Exceeded(result)
            } else {
                RateLimitOutcome::Skipped(result)
            });
        }

        match invoke().await {
            Ok(value) => Ok(value),
            Err(err) => {
                rollback_all(&successes, &key).await;
                Err(RateLimitOutcome::Inner(err))
            }
        }
    }
}
