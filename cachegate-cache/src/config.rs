use cachegate_core::config::{load_from_env, ConfigError};
use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// Environment-driven defaults for a cache (spec §6 "Configuration
/// properties"): every field is optional and falls back to the values
/// below when the environment leaves it unset.
#[derive(Clone, Debug, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub max_entries: Option<usize>,
    #[serde(default)]
    pub default_ttl_secs: Option<u64>,
    /// Parsed with [`crate::EvictionPolicy`]'s `FromStr`; unrecognized or
    /// absent values leave this `None`.
    #[serde(default)]
    pub eviction_policy: Option<String>,
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
    #[serde(default = "default_true")]
    pub enable_events: bool,
    #[serde(default)]
    pub fail_if_not_found: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            default_ttl_secs: None,
            eviction_policy: None,
            enable_metrics: true,
            enable_events: true,
            fail_if_not_found: false,
        }
    }
}

impl CacheConfig {
    /// Loads from `<PREFIX>__CACHE__*` environment variables, e.g.
    /// `CACHEGATE__CACHE__MAX_ENTRIES`.
    pub fn load(prefix: &str) -> Result<Self, ConfigError> {
        load_from_env(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_metrics_and_events() {
        let config = CacheConfig::default();
        assert!(config.enable_metrics);
        assert!(config.enable_events);
        assert!(!config.fail_if_not_found);
        assert_eq!(config.max_entries, None);
    }

    #[test]
    fn loads_defaults_from_empty_environment() {
        let config = CacheConfig::load("CACHEGATE_CACHE_TEST_UNSET").unwrap();
        assert!(config.enable_metrics);
        assert_eq!(config.eviction_policy, None);
    }
}
