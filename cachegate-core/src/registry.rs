use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::ordering::{sort_by_priority, Priority};

/// A read-only view of the host's dependency-injection container, as
/// consumed by this core (spec §1, §9 "Dynamic lookups by name").
///
/// Two operations only: `get(name)` for a single named component, and
/// `get_all_of(capability)` for an ordered collection of every registered
/// component tagged with a capability (e.g. every `CacheResolver`, every
/// `CacheManager`). The core never reflects over Rust's type system to
/// discover components — annotations and config carry plain string names,
/// and callers narrow the type-erased result with [`ComponentRegistryExt`].
pub trait ComponentRegistry: Send + Sync {
    fn get_component(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Every component registered under `capability`, already sorted per the
    /// priority contract of spec §5.
    fn get_all_of(&self, capability: &str) -> Vec<Arc<dyn Any + Send + Sync>>;
}

/// Typed narrowing helpers layered over the object-safe [`ComponentRegistry`].
pub trait ComponentRegistryExt: ComponentRegistry {
    fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get_component(name).and_then(|c| c.downcast::<T>().ok())
    }

    fn get_all<T: Any + Send + Sync>(&self, capability: &str) -> Vec<Arc<T>> {
        self.get_all_of(capability)
            .into_iter()
            .filter_map(|c| c.downcast::<T>().ok())
            .collect()
    }
}

impl<R: ComponentRegistry + ?Sized> ComponentRegistryExt for R {}

/// The default, in-process [`ComponentRegistry`]: a named-component map plus
/// capability buckets, both mutable at registration time and snapshotted
/// (cloned out from behind the lock) before any read-path iteration, per
/// spec §5's "take a stable snapshot for read paths to avoid holding a lock
/// across user code."
#[derive(Default)]
pub struct StaticComponentRegistry {
    components: DashMap<String, Arc<dyn Any + Send + Sync>>,
    capabilities: RwLock<HashMap<String, Vec<(Priority, Arc<dyn Any + Send + Sync>)>>>,
    next_sequence: std::sync::atomic::AtomicUsize,
}

impl StaticComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_named(&self, name: impl Into<String>, component: Arc<dyn Any + Send + Sync>) {
        self.components.insert(name.into(), component);
    }

    /// Registers `component` under `capability` with insertion-order
    /// sequencing baked into `priority` automatically if the caller passes
    /// `None`-sequenced tiers — callers normally just pass
    /// `Priority::Ordinary(0)` and rely on this method to stamp the real
    /// sequence number.
    pub fn register_capability(
        &self,
        capability: impl Into<String>,
        tier: PriorityTier,
        component: Arc<dyn Any + Send + Sync>,
    ) {
        let seq = self
            .next_sequence
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let priority = match tier {
            PriorityTier::Highest => Priority::Highest(seq),
            PriorityTier::Ordinary => Priority::Ordinary(seq),
            PriorityTier::Unordered => Priority::Unordered(seq),
        };
        let mut caps = self.capabilities.write();
        let bucket = caps.entry(capability.into()).or_default();
        bucket.push((priority, component));
        sort_by_priority(bucket, |(p, _)| *p);
    }
}

/// The three priority tiers a caller can register a capability member under;
/// [`StaticComponentRegistry`] stamps the actual insertion sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriorityTier {
    Highest,
    Ordinary,
    Unordered,
}

impl ComponentRegistry for StaticComponentRegistry {
    fn get_component(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.components.get(name).map(|e| e.value().clone())
    }

    fn get_all_of(&self, capability: &str) -> Vec<Arc<dyn Any + Send + Sync>> {
        let caps = self.capabilities.read();
        caps.get(capability)
            .map(|bucket| bucket.iter().map(|(_, c)| c.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_lookup_round_trips() {
        let registry = StaticComponentRegistry::new();
        registry.register_named("answer", Arc::new(42i32));
        assert_eq!(registry.get::<i32>("answer"), Some(Arc::new(42)));
        assert_eq!(registry.get::<i32>("missing"), None);
    }

    #[test]
    fn capability_collection_respects_priority_then_insertion_order() {
        let registry = StaticComponentRegistry::new();
        registry.register_capability("greeters", PriorityTier::Unordered, Arc::new("c".to_string()));
        registry.register_capability("greeters", PriorityTier::Highest, Arc::new("a".to_string()));
        registry.register_capability("greeters", PriorityTier::Ordinary, Arc::new("b".to_string()));

        let all: Vec<Arc<String>> = registry.get_all("greeters");
        let values: Vec<&str> = all.iter().map(|s| s.as_str()).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }
}
