use std::sync::Arc;

use cachegate_core::{sort_by_priority, Priority};
use indexmap::IndexSet;

use crate::error::CacheError;
use crate::manager::CacheManager;
use crate::storage::CacheStorage;

/// Merges several [`CacheManager`]s into one lookup surface, in priority
/// order (spec §2 item 7 "CacheResolver", §5 "Ordering of components").
pub trait CacheResolver<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// The first manager (by priority, then registration order) that has a
    /// cache named `name`. A single pass over the managers — see
    /// `SPEC_FULL.md` Open Question 2: the documented "second, duplicate
    /// pass" behavior is not reproduced here.
    fn resolve(&self, name: &str) -> Option<Arc<dyn CacheStorage<V>>>;

    /// As [`Self::resolve`], but creates the cache in the highest-priority
    /// manager when absent, unless `fail_if_not_found` is set.
    fn resolve_or_create(&self, name: &str) -> Result<Arc<dyn CacheStorage<V>>, CacheError>;

    /// The union of every manager's cache names, de-duplicated, in the order
    /// first observed while scanning managers by priority.
    fn all_cache_names(&self) -> Vec<String>;
}

/// The default [`CacheResolver`]: a chain of sub-resolvers tried first, in
/// priority order, falling back to an ordered list of bound [`CacheManager`]s
/// (spec §4.5 "composite implementation").
pub struct CompositeCacheResolver<V>
where
    V: Clone + Send + Sync + 'static,
{
    sub_resolvers: Vec<(Priority, Arc<dyn CacheResolver<V>>)>,
    managers: Vec<(Priority, Arc<dyn CacheManager<V>>)>,
    fail_if_not_found: bool,
}

impl<V> CompositeCacheResolver<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(fail_if_not_found: bool) -> Self {
        Self { sub_resolvers: Vec::new(), managers: Vec::new(), fail_if_not_found }
    }

    pub fn add_manager(&mut self, priority: Priority, manager: Arc<dyn CacheManager<V>>) {
        self.managers.push((priority, manager));
        sort_by_priority(&mut self.managers, |(p, _)| *p);
    }

    /// Chains another resolver ahead of this resolver's own bound managers
    /// (spec §4.5 step 1).
    pub fn add_sub_resolver(&mut self, priority: Priority, resolver: Arc<dyn CacheResolver<V>>) {
        self.sub_resolvers.push((priority, resolver));
        sort_by_priority(&mut self.sub_resolvers, |(p, _)| *p);
    }
}

impl<V> CacheResolver<V> for CompositeCacheResolver<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn resolve(&self, name: &str) -> Option<Arc<dyn CacheStorage<V>>> {
        self.sub_resolvers
            .iter()
            .find_map(|(_, resolver)| resolver.resolve(name))
            .or_else(|| self.managers.iter().find_map(|(_, manager)| manager.cache(name)))
    }

    fn resolve_or_create(&self, name: &str) -> Result<Arc<dyn CacheStorage<V>>, CacheError> {
        if let Some(existing) = self.resolve(name) {
            return Ok(existing);
        }
        if self.fail_if_not_found {
            return Err(CacheError::NoCacheFound { name: name.to_string() });
        }
        match self.managers.first() {
            Some((_, manager)) => Ok(manager.get_or_create(name)),
            None => Err(CacheError::NoCacheFound { name: name.to_string() }),
        }
    }

    fn all_cache_names(&self) -> Vec<String> {
        let mut names = IndexSet::new();
        for (_, resolver) in &self.sub_resolvers {
            for name in resolver.all_cache_names() {
                names.insert(name);
            }
        }
        for (_, manager) in &self.managers {
            for name in manager.cache_names() {
                names.insert(name);
            }
        }
        names.into_iter().collect()
    }
}
