use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

/// The `shouldApply(context) -> bool` capability consumed by every
/// `Cacheable`/`CachePut`/`CacheEvict`/`RateLimit` descriptor (spec §1, §4.9).
///
/// Generic over the operation-context type `Ctx` so the same trait serves
/// both the cache and rate-limit engines without either depending on the
/// other's context shape. Evaluation may suspend (spec §5), so the method is
/// async even though the two built-in conditions below never actually await.
#[async_trait]
pub trait Condition<Ctx: ?Sized + Sync>: Send + Sync {
    async fn should_apply(&self, ctx: &Ctx) -> bool;
}

struct AlwaysTrue<Ctx: ?Sized>(PhantomData<fn(&Ctx)>);
struct AlwaysFalse<Ctx: ?Sized>(PhantomData<fn(&Ctx)>);

// SAFETY: PhantomData<fn(&Ctx)> is Send+Sync regardless of Ctx.
unsafe impl<Ctx: ?Sized> Send for AlwaysTrue<Ctx> {}
unsafe impl<Ctx: ?Sized> Sync for AlwaysTrue<Ctx> {}
unsafe impl<Ctx: ?Sized> Send for AlwaysFalse<Ctx> {}
unsafe impl<Ctx: ?Sized> Sync for AlwaysFalse<Ctx> {}

#[async_trait]
impl<Ctx: ?Sized + Sync> Condition<Ctx> for AlwaysTrue<Ctx> {
    async fn should_apply(&self, _ctx: &Ctx) -> bool {
        true
    }
}

#[async_trait]
impl<Ctx: ?Sized + Sync> Condition<Ctx> for AlwaysFalse<Ctx> {
    async fn should_apply(&self, _ctx: &Ctx) -> bool {
        false
    }
}

/// A [`Condition`] that always applies. Used as the default `condition` on a
/// descriptor that didn't specify one.
pub fn always<Ctx: Sync + 'static>() -> Arc<dyn Condition<Ctx>> {
    Arc::new(AlwaysTrue::<Ctx>(PhantomData))
}

/// A [`Condition`] that never applies. Used as the default `unless` on a
/// descriptor that didn't specify one (so `unless` defaults to "never skip").
pub fn never<Ctx: Sync + 'static>() -> Arc<dyn Condition<Ctx>> {
    Arc::new(AlwaysFalse::<Ctx>(PhantomData))
}

/// Wraps a plain synchronous predicate as a [`Condition`], for callers that
/// don't need to suspend to evaluate it (the common case — most `condition`/
/// `unless` checks just inspect arguments or a result already in hand).
pub struct FnCondition<Ctx: ?Sized, F>
where
    F: Fn(&Ctx) -> bool + Send + Sync,
{
    f: F,
    _marker: PhantomData<fn(&Ctx)>,
}

impl<Ctx: ?Sized, F> FnCondition<Ctx, F>
where
    F: Fn(&Ctx) -> bool + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<Ctx, F> Condition<Ctx> for FnCondition<Ctx, F>
where
    Ctx: ?Sized + Sync,
    F: Fn(&Ctx) -> bool + Send + Sync,
{
    async fn should_apply(&self, ctx: &Ctx) -> bool {
        (self.f)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_applies() {
        let c: Arc<dyn Condition<str>> = always();
        assert!(c.should_apply("anything").await);
    }

    #[tokio::test]
    async fn never_applies() {
        let c: Arc<dyn Condition<str>> = never();
        assert!(!c.should_apply("anything").await);
    }

    #[tokio::test]
    async fn fn_condition_delegates() {
        let c = FnCondition::new(|s: &str| s == "yes");
        assert!(c.should_apply("yes").await);
        assert!(!c.should_apply("no").await);
    }
}
