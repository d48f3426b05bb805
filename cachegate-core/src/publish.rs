use std::marker::PhantomData;

use async_trait::async_trait;

/// Fire-and-forget-from-the-caller's-perspective, but internally awaited,
/// event publication capability (spec §1, §6, §9 "Events").
///
/// Generic over the event type so `cachegate-cache` and `cachegate-ratelimit`
/// each supply their own `CacheEvent`/`RateLimitEvent` without this crate
/// depending on either.
#[async_trait]
pub trait Publish<Event: Send + 'static>: Send + Sync {
    async fn publish(&self, event: Event);
}

/// A [`Publish`] that discards every event. The default for storages
/// constructed with `events_enabled = false`, and a convenient base for
/// hosts wiring up their own event bus incrementally.
pub struct NoopPublisher<Event>(PhantomData<fn(Event)>);

impl<Event> Default for NoopPublisher<Event> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

// SAFETY: PhantomData<fn(Event)> is Send+Sync regardless of Event.
unsafe impl<Event> Send for NoopPublisher<Event> {}
unsafe impl<Event> Sync for NoopPublisher<Event> {}

#[async_trait]
impl<Event: Send + 'static> Publish<Event> for NoopPublisher<Event> {
    async fn publish(&self, _event: Event) {}
}
