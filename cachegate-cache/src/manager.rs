use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use indexmap::IndexSet;

use cachegate_core::{sort_by_priority, Priority};

use crate::storage::CacheStorage;

/// Owns a set of named [`CacheStorage`] instances and knows how to create new
/// ones on demand (spec §2 item 6 "CacheManager").
pub trait CacheManager<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// The existing named cache, if one has been registered or created.
    fn cache(&self, name: &str) -> Option<Arc<dyn CacheStorage<V>>>;

    /// The existing named cache, or a freshly created and registered one.
    fn get_or_create(&self, name: &str) -> Arc<dyn CacheStorage<V>>;

    /// Every name currently registered, in no particular order.
    fn cache_names(&self) -> Vec<String>;
}

/// Builds a [`CacheStorage`] for a name this manager has never seen before.
pub type CacheFactory<V> = Arc<dyn Fn(&str) -> Arc<dyn CacheStorage<V>> + Send + Sync>;

/// The default [`CacheManager`]: a `DashMap` of named storages plus a factory
/// closure for auto-creation, mirroring the teacher's static cache registry
/// generalized from a single global map to a manager instance a
/// [`crate::resolver::CacheResolver`] can hold many of.
///
/// Also the composite implementation spec §4.4 describes: ordered
/// sub-managers are consulted before this manager's own direct storage set,
/// and `cache_names` is the union of both.
pub struct SimpleCacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    caches: DashMap<String, Arc<dyn CacheStorage<V>>>,
    factory: CacheFactory<V>,
    sub_managers: RwLock<Vec<(Priority, Arc<dyn CacheManager<V>>)>>,
}

impl<V> SimpleCacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(factory: CacheFactory<V>) -> Self {
        Self { caches: DashMap::new(), factory, sub_managers: RwLock::new(Vec::new()) }
    }

    /// Registers an already-constructed storage under its own name.
    pub fn register(&self, storage: Arc<dyn CacheStorage<V>>) {
        self.caches.insert(storage.name().to_string(), storage);
    }

    /// Adds a sub-manager consulted, in priority order, before this
    /// manager's own direct storage set (spec §4.4).
    pub fn add_sub_manager(&self, priority: Priority, manager: Arc<dyn CacheManager<V>>) {
        let mut subs = self.sub_managers.write().expect("sub_managers lock poisoned");
        subs.push((priority, manager));
        sort_by_priority(&mut subs, |(p, _)| *p);
    }
}

impl<V> CacheManager<V> for SimpleCacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn cache(&self, name: &str) -> Option<Arc<dyn CacheStorage<V>>> {
        let subs = self.sub_managers.read().expect("sub_managers lock poisoned");
        if let Some(found) = subs.iter().find_map(|(_, manager)| manager.cache(name)) {
            return Some(found);
        }
        drop(subs);
        self.caches.get(name).map(|entry| entry.clone())
    }

    fn get_or_create(&self, name: &str) -> Arc<dyn CacheStorage<V>> {
        if let Some(existing) = self.cache(name) {
            return existing;
        }
        let created = (self.factory)(name);
        self.caches.insert(name.to_string(), created.clone());
        created
    }

    fn cache_names(&self) -> Vec<String> {
        let mut names: IndexSet<String> = IndexSet::new();
        let subs = self.sub_managers.read().expect("sub_managers lock poisoned");
        for (_, manager) in subs.iter() {
            for name in manager.cache_names() {
                names.insert(name);
            }
        }
        drop(subs);
        for entry in self.caches.iter() {
            names.insert(entry.key().clone());
        }
        names.into_iter().collect()
    }
}
