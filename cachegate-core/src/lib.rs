//! # cachegate-core
//!
//! Shared primitives consumed by both the cache engine (`cachegate-cache`) and
//! the rate-limit engine (`cachegate-ratelimit`):
//!
//! - [`Clock`] / [`Zone`] — the single injected time source all TTL and
//!   window math flows through.
//! - [`ComponentRegistry`] — the read-only, named-lookup view the core takes
//!   of the host's dependency-injection container. The core never reflects
//!   over types; annotations carry string names (see [`Priority`] for the
//!   ordering contract applied when a registry enumerates a capability).
//! - [`Condition`] — the `shouldApply(context) -> bool` capability consumed
//!   by `Cacheable`/`CachePut`/`CacheEvict`/`RateLimit` descriptors.
//! - [`KeyGenerator`] — `generate(target, method, args) -> Key` capability.
//! - [`Publish`] — fire-and-forget-from-the-caller's-perspective, awaited
//!   internally, event publication capability.
//! - [`MethodInvocation`] — the handle the host's interception framework
//!   would hand to the core around a single method call.
//!
//! None of these are backends; they are the seams the cache and rate-limit
//! crates are built against, with small in-process default implementations
//! provided for hosts that don't bring their own DI container or event bus.

mod clock;
mod condition;
mod invocation;
mod keygen;
mod ordering;
mod publish;
mod registry;

pub mod config;

pub use clock::{Clock, FrozenClock, SystemClock, Zone};
pub use condition::{always, never, Condition, FnCondition};
pub use invocation::{MethodInvocation, MethodMetadata, SimpleMethodInvocation};
pub use keygen::{DefaultKeyGenerator, Key, KeyGenerator, SharedKeyGenerator};
pub use ordering::{sort_by_priority, Priority};
pub use publish::{NoopPublisher, Publish};
pub use registry::{ComponentRegistry, StaticComponentRegistry};
