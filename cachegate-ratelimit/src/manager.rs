use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use indexmap::IndexSet;

use cachegate_core::{sort_by_priority, Priority};

use crate::storage::RateLimitStorage;

/// Owns a set of named [`RateLimitStorage`] instances and knows how to
/// create new ones on demand (spec §2 item 6 analogue for rate limiting).
pub trait RateLimitManager: Send + Sync {
    fn storage(&self, name: &str) -> Option<Arc<dyn RateLimitStorage>>;
    fn get_or_create(&self, name: &str) -> Arc<dyn RateLimitStorage>;
    fn storage_names(&self) -> Vec<String>;
}

/// Unconditionally builds a fresh storage for a name no sub-manager, direct
/// storage, or registered creator claimed (spec §4.12 step 4).
pub type RateLimitFactory = Arc<dyn Fn(&str) -> Arc<dyn RateLimitStorage> + Send + Sync>;

/// A creator consulted before the default factory, declining by returning
/// `None` for names it doesn't own (spec §4.12 step 3, "registered storage
/// creators (`name -> Storage?`)").
pub type RateLimitCreator = Arc<dyn Fn(&str) -> Option<Arc<dyn RateLimitStorage>> + Send + Sync>;

/// The default [`RateLimitManager`]: a `DashMap` of named storages plus a
/// factory closure for auto-creation — the rate-limit-side twin of
/// `cachegate_cache::SimpleCacheManager`.
///
/// Also the composite implementation spec §4.12 describes: `get_or_create`
/// walks, in order, ordered sub-managers, this manager's own direct storage
/// set, registered creators, then the default factory (spec §4.12 steps
/// 1-4; step 5's `failIfNotFound`/`createIfNotFound` policy is owned by
/// [`crate::resolver::CompositeRateLimitResolver`] instead, which already
/// decides whether to call `get_or_create` at all — see `DESIGN.md`).
pub struct SimpleRateLimitManager {
    storages: DashMap<String, Arc<dyn RateLimitStorage>>,
    factory: RateLimitFactory,
    sub_managers: RwLock<Vec<(Priority, Arc<dyn RateLimitManager>)>>,
    creators: RwLock<Vec<RateLimitCreator>>,
}

impl SimpleRateLimitManager {
    pub fn new(factory: RateLimitFactory) -> Self {
        Self { storages: DashMap::new(), factory, sub_managers: RwLock::new(Vec::new()), creators: RwLock::new(Vec::new()) }
    }

    pub fn register(&self, storage: Arc<dyn RateLimitStorage>) {
        self.storages.insert(storage.name().to_string(), storage);
    }

    /// Adds a sub-manager consulted, in priority order, before this
    /// manager's own direct storage set (spec §4.12 step 1).
    pub fn add_sub_manager(&self, priority: Priority, manager: Arc<dyn RateLimitManager>) {
        let mut subs = self.sub_managers.write().expect("sub_managers lock poisoned");
        subs.push((priority, manager));
        sort_by_priority(&mut subs, |(p, _)| *p);
    }

    /// Registers a creator tried, in registration order, before the default
    /// auto-create factory (spec §4.12 step 3).
    pub fn add_creator(&self, creator: RateLimitCreator) {
        self.creators.write().expect("creators lock poisoned").push(creator);
    }
}

impl RateLimitManager for SimpleRateLimitManager {
    fn storage(&self, name: &str) -> Option<Arc<dyn RateLimitStorage>> {
        let subs = self.sub_managers.read().expect("sub_managers lock poisoned");
        if let Some(found) = subs.iter().find_map(|(_, manager)| manager.storage(name)) {
            return Some(found);
        }
        drop(subs);
        self.storages.get(name).map(|entry| entry.clone())
    }

    fn get_or_create(&self, name: &str) -> Arc<dyn RateLimitStorage> {
        if let Some(existing) = self.storage(name) {
            return existing;
        }

        let creators = self.creators.read().expect("creators lock poisoned");
        for creator in creators.iter() {
            if let Some(created) = creator(name) {
                self.storages.insert(name.to_string(), created.clone());
                return created;
            }
        }
        drop(creators);

        let created = (self.factory)(name);
        self.storages.insert(name.to_string(), created.clone());
        created
    }

    fn storage_names(&self) -> Vec<String> {
        let mut names: IndexSet<String> = IndexSet::new();
        let subs = self.sub_managers.read().expect("sub_managers lock poisoned");
        for (_, manager) in subs.iter() {
            for name in manager.storage_names() {
                names.insert(name);
            }
        }
        drop(subs);
        for entry in self.storages.iter() {
            names.insert(entry.key().clone());
        }
        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryRateLimitStorage;
    use cachegate_core::{Clock, FrozenClock, NoopPublisher};

    fn factory() -> RateLimitFactory {
        Arc::new(|name: &str| {
            let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
            Arc::new(InMemoryRateLimitStorage::new(name, clock, Arc::new(NoopPublisher::default()))) as Arc<dyn RateLimitStorage>
        })
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let manager = SimpleRateLimitManager::new(factory());
        let first = manager.get_or_create("api");
        let second = manager.get_or_create("api");
        assert_eq!(first.name(), second.name());
        assert_eq!(manager.storage_names(), vec!["api".to_string()]);
    }

    #[test]
    fn sub_manager_is_consulted_before_the_direct_storage_set() {
        let sub = Arc::new(SimpleRateLimitManager::new(factory()));
        sub.get_or_create("api");

        let top = SimpleRateLimitManager::new(factory());
        top.add_sub_manager(Priority::Highest(0), sub.clone());

        assert!(top.storage("api").is_some(), "lookup must delegate to the sub-manager");
        assert!(top.storages.get("api").is_none(), "the sub-manager's storage must not be copied into the parent");
    }

    #[test]
    fn registered_creator_wins_over_the_default_factory() {
        let manager = SimpleRateLimitManager::new(factory());
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
        let custom = Arc::new(InMemoryRateLimitStorage::new("from-creator", clock, Arc::new(NoopPublisher::default())));
        let custom_for_closure = custom.clone();
        manager.add_creator(Arc::new(move |name: &str| {
            (name == "special").then(|| custom_for_closure.clone() as Arc<dyn RateLimitStorage>)
        }));

        let created = manager.get_or_create("special");
        assert_eq!(created.name(), "from-creator");

        let fallback = manager.get_or_create("ordinary");
        assert_eq!(fallback.name(), "ordinary", "a declining creator must fall through to the default factory");
    }

    #[test]
    fn storage_names_is_the_union_of_sub_manager_and_direct_names() {
        let sub = Arc::new(SimpleRateLimitManager::new(factory()));
        sub.get_or_create("api");

        let top = SimpleRateLimitManager::new(factory());
        top.add_sub_manager(Priority::Highest(0), sub);
        top.get_or_create("events");

        let mut names = top.storage_names();
        names.sort();
        assert_eq!(names, vec!["api".to_string(), "events".to_string()]);
    }
}
