use std::sync::Arc;

use cachegate_core::{sort_by_priority, Priority};
use indexmap::IndexSet;

use crate::error::RateLimitError;
use crate::manager::RateLimitManager;
use crate::storage::RateLimitStorage;

/// Merges several [`RateLimitManager`]s into one lookup surface, in priority
/// order — the rate-limit-side twin of `cachegate_cache::CacheResolver`.
pub trait RateLimitResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn RateLimitStorage>>;
    fn resolve_or_create(&self, name: &str) -> Result<Arc<dyn RateLimitStorage>, RateLimitError>;
    fn all_storage_names(&self) -> Vec<String>;
}

/// The default [`RateLimitResolver`]: a chain of sub-resolvers tried first,
/// in priority order, falling back to an ordered list of bound
/// [`RateLimitManager`]s (spec §4.13 "composite implementation").
pub struct CompositeRateLimitResolver {
    sub_resolvers: Vec<(Priority, Arc<dyn RateLimitResolver>)>,
    managers: Vec<(Priority, Arc<dyn RateLimitManager>)>,
    fail_if_not_found: bool,
}

impl CompositeRateLimitResolver {
    pub fn new(fail_if_not_found: bool) -> Self {
        Self { sub_resolvers: Vec::new(), managers: Vec::new(), fail_if_not_found }
    }

    pub fn add_manager(&mut self, priority: Priority, manager: Arc<dyn RateLimitManager>) {
        self.managers.push((priority, manager));
        sort_by_priority(&mut self.managers, |(p, _)| *p);
    }

    /// Chains another resolver ahead of this resolver's own bound managers
    /// (spec §4.13 step 1).
    pub fn add_sub_resolver(&mut self, priority: Priority, resolver: Arc<dyn RateLimitResolver>) {
        self.sub_resolvers.push((priority, resolver));
        sort_by_priority(&mut self.sub_resolvers, |(p, _)| *p);
    }
}

impl RateLimitResolver for CompositeRateLimitResolver {
    fn resolve(&self, name: &str) -> Option<Arc<dyn RateLimitStorage>> {
        self.sub_resolvers
            .iter()
            .find_map(|(_, resolver)| resolver.resolve(name))
            .or_else(|| self.managers.iter().find_map(|(_, manager)| manager.storage(name)))
    }

    fn resolve_or_create(&self, name: &str) -> Result<Arc<dyn RateLimitStorage>, RateLimitError> {
        if let Some(existing) = self.resolve(name) {
            return Ok(existing);
        }
        if self.fail_if_not_found {
            return Err(RateLimitError::NoStorageFound { name: name.to_string() });
        }
        match self.managers.first() {
            Some((_, manager)) => Ok(manager.get_or_create(name)),
            None => Err(RateLimitError::NoStorageFound { name: name.to_string() }),
        }
    }

    fn all_storage_names(&self) -> Vec<String> {
        let mut names = IndexSet::new();
        for (_, resolver) in &self.sub_resolvers {
            for name in resolver.all_storage_names() {
                names.insert(name);
            }
        }
        for (_, manager) in &self.managers {
            for name in manager.storage_names() {
                names.insert(name);
            }
        }
        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{RateLimitFactory, SimpleRateLimitManager};
    use crate::storage::InMemoryRateLimitStorage;
    use cachegate_core::{Clock, FrozenClock, NoopPublisher};

    fn factory() -> RateLimitFactory {
        Arc::new(|name: &str| {
            let clock: Arc<dyn Clock> = Arc::new(FrozenClock::starting_now());
            Arc::new(InMemoryRateLimitStorage::new(name, clock, Arc::new(NoopPublisher::default()))) as Arc<dyn RateLimitStorage>
        })
    }

    #[test]
    fn resolve_or_create_uses_first_manager() {
        let primary = Arc::new(SimpleRateLimitManager::new(factory()));
        let mut resolver = CompositeRateLimitResolver::new(false);
        resolver.add_manager(Priority::Highest(0), primary.clone());

        let created = resolver.resolve_or_create("api").unwrap();
        assert_eq!(created.name(), "api");
    }

    #[test]
    fn fail_if_not_found_errors() {
        let resolver = CompositeRateLimitResolver::new(true);
        assert!(matches!(resolver.resolve_or_create("missing"), Err(RateLimitError::NoStorageFound { .. })));
    }

    #[test]
    fn sub_resolver_is_tried_before_this_resolver_s_own_managers() {
        let sub_manager = Arc::new(SimpleRateLimitManager::new(factory()));
        sub_manager.get_or_create("api");
        let mut sub_resolver = CompositeRateLimitResolver::new(false);
        sub_resolver.add_manager(Priority::Highest(0), sub_manager.clone());

        let own_manager = Arc::new(SimpleRateLimitManager::new(factory()));
        let mut resolver = CompositeRateLimitResolver::new(false);
        resolver.add_sub_resolver(Priority::Highest(0), Arc::new(sub_resolver));
        resolver.add_manager(Priority::Highest(0), own_manager.clone());

        let resolved = resolver.resolve("api").unwrap();
        assert_eq!(resolved.name(), sub_manager.storage("api").unwrap().name());
        assert!(own_manager.storage("api").is_none(), "the sub-resolver's hit must not leak into this resolver's own manager");
    }

    #[test]
    fn all_storage_names_includes_sub_resolver_names() {
        let sub_manager = Arc::new(SimpleRateLimitManager::new(factory()));
        sub_manager.get_or_create("api");
        let mut sub_resolver = CompositeRateLimitResolver::new(false);
        sub_resolver.add_manager(Priority::Highest(0), sub_manager);

        let own_manager = Arc::new(SimpleRateLimitManager::new(factory()));
        own_manager.get_or_create("events");
        let mut resolver = CompositeRateLimitResolver::new(false);
        resolver.add_sub_resolver(Priority::Highest(0), Arc::new(sub_resolver));
        resolver.add_manager(Priority::Highest(0), own_manager);

        let mut names = resolver.all_storage_names();
        names.sort();
        assert_eq!(names, vec!["api".to_string(), "events".to_string()]);
    }
}
