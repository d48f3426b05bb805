//! Environment-driven configuration loading (spec §6 "Configuration
//! properties").
//!
//! Both subsystems declare their own `#[derive(serde::Deserialize)]` struct
//! (`cachegate_cache::config::CacheConfig`, `cachegate_ratelimit::config::RateLimitConfig`)
//! with `#[serde(default)]` fields matching the defaults in spec §6; this
//! module only supplies the shared loading mechanics.

use config::{Config, Environment};
use serde::de::DeserializeOwned;

pub use config::ConfigError;

/// Loads `T` from environment variables under `prefix`, using `__` as the
/// nested-key separator (so `<prefix>.cache.max-entries` becomes the env var
/// `<PREFIX>__CACHE__MAX_ENTRIES`), falling back to `T::default()` for any
/// field the environment doesn't set.
///
/// `T` is expected to derive `Default` and `serde::Deserialize` with
/// `#[serde(default)]` on every field, so a completely empty environment
/// yields exactly the spec's stated defaults.
pub fn load_from_env<T>(prefix: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let source = Environment::with_prefix(prefix)
        .separator("__")
        .try_parsing(true);

    let config = Config::builder().add_source(source).build()?;

    match config.try_deserialize() {
        Ok(value) => Ok(value),
        // An environment with no relevant variables set produces an empty
        // config; deserializing into a struct with all-`#[serde(default)]`
        // fields should succeed, but guard against edge cases in the
        // `config` crate's empty-map handling by falling back explicitly.
        Err(ConfigError::NotFound(_)) => Ok(T::default()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Example {
        #[serde(default)]
        ttl: Option<u64>,
        #[serde(default = "default_max_entries")]
        max_entries: u64,
    }

    fn default_max_entries() -> u64 {
        1000
    }

    #[test]
    fn loads_defaults_when_environment_unset() {
        let loaded: Example = load_from_env("CACHEGATE_TEST_UNSET_PREFIX").unwrap();
        assert_eq!(loaded.ttl, None);
        assert_eq!(loaded.max_entries, 1000);
    }
}
