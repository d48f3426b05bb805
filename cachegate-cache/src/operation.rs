use std::future::Future;
use std::sync::Arc;

use cachegate_core::Key;

use crate::context::CacheOperationContext;
use crate::descriptor::{CacheEvict, CachePut, Cacheable};
use crate::error::CacheError;
use crate::storage::CacheStorage;

/// Why a guarded call did not produce the underlying call's own result: a
/// cache-side failure (storage/resolver), or the underlying call failing on
/// its own terms. Generalizing `execute`'s error type this way means a
/// guarded method keeps its own error type end to end instead of having to
/// fit its business errors through [`CacheError`].
#[derive(Debug)]
pub enum CacheOutcome<E> {
    Cache(CacheError),
    Inner(E),
}

impl<E> From<CacheError> for CacheOutcome<E> {
    fn from(err: CacheError) -> Self {
        CacheOutcome::Cache(err)
    }
}

fn resolve_all<V>(
    ctx: &CacheOperationContext<V>,
    names: &[String],
) -> Result<Vec<Arc<dyn CacheStorage<V>>>, CacheError>
where
    V: Clone + Send + Sync + 'static,
{
    let mut storages = Vec::with_capacity(names.len());
    for name in names {
        match ctx.resolver.resolve_or_create(name) {
            Ok(storage) => storages.push(storage),
            Err(err) => ctx.error_handler.handle(err)?,
        }
    }
    Ok(storages)
}

/// Writes `value` under `key` into every storage, honoring `unless` and the
/// context's error handler. Shared by [`CachePutOperation`] and the
/// full-miss path of [`CacheableOperation`] — see `SPEC_FULL.md` Open
/// Question 1: a cache miss commits its result through this same routine
/// rather than a bespoke direct `put`.
async fn commit<V>(
    storages: &[Arc<dyn CacheStorage<V>>],
    ctx: &CacheOperationContext<V>,
    key: &Key,
    value: &V,
    ttl: Option<std::time::Duration>,
    unless: Option<&crate::descriptor::InvocationCondition>,
) -> Result<(), CacheError>
where
    V: Clone + Send + Sync + 'static,
{
    if ctx.evaluate(unless, false).await {
        return Ok(());
    }
    for storage in storages {
        if let Err(err) = storage.put(key.clone(), value.clone(), ttl).await {
            ctx.error_handler.handle(err)?;
        }
    }
    Ok(())
}

/// Executes a `Cacheable`-guarded call: serve from the first cache with a
/// hit, backfilling any earlier caches that missed, or invoke the
/// underlying call and commit its result (spec §2 item 8 operation
/// semantics).
pub struct CacheableOperation;

impl CacheableOperation {
    pub async fn execute<V, F, Fut, E>(
        &self,
        descriptor: &Cacheable,
        ctx: &CacheOperationContext<V>,
        invoke: F,
    ) -> Result<V, CacheOutcome<E>>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !ctx.evaluate(descriptor.condition.as_ref(), true).await {
            return invoke().await.map_err(CacheOutcome::Inner);
        }

        let key = ctx.key_for(descriptor.key_generator.as_ref()).await;
        let storages = resolve_all(ctx, &descriptor.cache_names)?;

        let mut missed = Vec::new();
        for storage in &storages {
            match storage.get(&key).await {
                Ok(Some(entry)) => {
                    let value = entry.into_value();
                    for miss_storage in &missed {
                        let _: Result<_, CacheError> = commit(
                            std::slice::from_ref(miss_storage),
                            ctx,
                            &key,
                            &value,
                            descriptor.ttl,
                            descriptor.unless.as_ref(),
                        )
                        .await;
                    }
                    return Ok(value);
                }
                Ok(None) => missed.push(storage.clone()),
                Err(err) => ctx.error_handler.handle(err)?,
            }
        }

        let value = invoke().await.map_err(CacheOutcome::Inner)?;
        commit(&storages, ctx, &key, &value, descriptor.ttl, descriptor.unless.as_ref()).await?;
        Ok(value)
    }
}

/// Executes a `CachePut`-guarded call: always invoke, then (unless
/// `condition`/`unless` say otherwise) write the result to every named
/// cache (spec §2 item 9 operation semantics).
pub struct CachePutOperation;

impl CachePutOperation {
    pub async fn execute<V, F, Fut, E>(
        &self,
        descriptor: &CachePut,
        ctx: &CacheOperationContext<V>,
        invoke: F,
    ) -> Result<V, CacheOutcome<E>>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let value = invoke().await.map_err(CacheOutcome::Inner)?;

        if !ctx.evaluate(descriptor.condition.as_ref(), true).await {
            return Ok(value);
        }

        let key = ctx.key_for(descriptor.key_generator.as_ref()).await;
        let storages = resolve_all(ctx, &descriptor.cache_names)?;
        commit(&storages, ctx, &key, &value, descriptor.ttl, descriptor.unless.as_ref()).await?;
        Ok(value)
    }
}

/// Executes a `CacheEvict`-guarded call: remove one key or clear every
/// entry, before or after the underlying call runs (spec §2 item 10
/// operation semantics). Always uses `evict_if_present` — see
/// `SPEC_FULL.md` Open Question 3.
pub struct CacheEvictOperation;

impl CacheEvictOperation {
    pub async fn execute<V, F, Fut, E>(
        &self,
        descriptor: &CacheEvict,
        ctx: &CacheOperationContext<V>,
        invoke: F,
    ) -> Result<V, CacheOutcome<E>>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if ctx.evaluate(descriptor.unless.as_ref(), false).await {
            return invoke().await.map_err(CacheOutcome::Inner);
        }
        if !ctx.evaluate(descriptor.condition.as_ref(), true).await {
            return invoke().await.map_err(CacheOutcome::Inner);
        }

        let storages = resolve_all(ctx, &descriptor.cache_names)?;

        if descriptor.before_invocation {
            self.evict(&storages, ctx, descriptor).await?;
            invoke().await.map_err(CacheOutcome::Inner)
        } else {
            let value = invoke().await.map_err(CacheOutcome::Inner)?;
            self.evict(&storages, ctx, descriptor).await?;
            Ok(value)
        }
    }

    async fn evict<V>(
        &self,
        storages: &[Arc<dyn CacheStorage<V>>],
        ctx: &CacheOperationContext<V>,
        descriptor: &CacheEvict,
    ) -> Result<(), CacheError>
    where
        V: Clone + Send + Sync + 'static,
    {
        if descriptor.all_entries {
            for storage in storages {
                if let Err(err) = storage.clear().await {
                    ctx.error_handler.handle(err)?;
                }
            }
            return Ok(());
        }

        let key = ctx.key_for(descriptor.key_generator.as_ref()).await;
        for storage in storages {
            if let Err(err) = storage.evict_if_present(&key).await {
                ctx.error_handler.handle(err)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::SilentCacheErrorHandler;
    use crate::manager::{CacheFactory, SimpleCacheManager};
    use crate::resolver::CompositeCacheResolver;
    use crate::storage::InMemoryCacheStorage;
    use cachegate_core::{Clock, DefaultKeyGenerator, FrozenClock, NoopPublisher, Priority, SimpleMethodInvocation};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn factory() -> CacheFactory<String> {
        Arc::new(|name: &str| {
            let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
            Arc::new(InMemoryCacheStorage::new(name, clock, Arc::new(NoopPublisher::default())))
                as Arc<dyn CacheStorage<String>>
        })
    }

    fn ctx() -> CacheOperationContext<String> {
        let manager = Arc::new(SimpleCacheManager::new(factory()));
        let mut resolver = CompositeCacheResolver::new(false);
        resolver.add_manager(Priority::Highest(0), manager);
        let invocation = Arc::new(SimpleMethodInvocation::new("Svc", "m", vec!["1".into()]));
        CacheOperationContext::new(
            invocation,
            Arc::new(resolver),
            Arc::new(DefaultKeyGenerator),
            Arc::new(SilentCacheErrorHandler),
        )
    }

    #[tokio::test]
    async fn cacheable_invokes_once_on_repeated_calls() {
        let ctx = ctx();
        let descriptor = Cacheable::new(["users"]);
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let calls_ref = &calls;
            let value = CacheableOperation
                .execute(&descriptor, &ctx, || async move {
                    calls_ref.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>("computed".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "computed");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_put_always_invokes_and_overwrites() {
        let ctx = ctx();
        let descriptor = CachePut::new(["users"]);

        CachePutOperation.execute(&descriptor, &ctx, || async { Ok::<_, CacheError>("v1".to_string()) }).await.unwrap();
        CachePutOperation.execute(&descriptor, &ctx, || async { Ok::<_, CacheError>("v2".to_string()) }).await.unwrap();

        let cacheable = Cacheable::new(["users"]);
        let value = CacheableOperation
            .execute(&cacheable, &ctx, || async { Ok::<_, CacheError>("unused".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "v2");
    }

    #[tokio::test]
    async fn cache_evict_removes_entry_after_invocation() {
        let ctx = ctx();
        let cacheable = Cacheable::new(["users"]);
        CacheableOperation.execute(&cacheable, &ctx, || async { Ok::<_, CacheError>("cached".to_string()) }).await.unwrap();

        let evict = CacheEvict::new(["users"]);
        CacheEvictOperation
            .execute(&evict, &ctx, || async { Ok::<_, CacheError>("ignored".to_string()) })
            .await
            .unwrap();

        let calls = AtomicU32::new(0);
        let value = CacheableOperation
            .execute(&cacheable, &ctx, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>("recomputed".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "recomputed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cacheable_propagates_the_inner_call_s_own_error() {
        let ctx = ctx();
        let descriptor = Cacheable::new(["users"]);

        #[derive(Debug, PartialEq)]
        struct Boom;

        let result = CacheableOperation.execute(&descriptor, &ctx, || async { Err::<String, _>(Boom) }).await;
        assert!(matches!(result, Err(CacheOutcome::Inner(Boom))));
    }
}
