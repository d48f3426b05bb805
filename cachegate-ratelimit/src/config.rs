use cachegate_core::config::{load_from_env, ConfigError};
use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// Environment-driven defaults for a rate limit storage (spec §6
/// "Configuration properties", rate-limit section): every field is
/// optional and falls back to the values below when the environment
/// leaves it unset.
#[derive(Clone, Debug, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
    #[serde(default = "default_true")]
    pub enable_events: bool,
    #[serde(default = "default_true")]
    pub enable_auto_creation: bool,
    #[serde(default)]
    pub fail_if_not_found: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            timezone: None,
            enable_metrics: true,
            enable_events: true,
            enable_auto_creation: true,
            fail_if_not_found: false,
        }
    }
}

impl RateLimitConfig {
    /// Loads from `<PREFIX>__RATE_LIMIT__*` environment variables, e.g.
    /// `CACHEGATE__RATE_LIMIT__FAIL_IF_NOT_FOUND`.
    pub fn load(prefix: &str) -> Result<Self, ConfigError> {
        load_from_env(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_metrics_events_and_auto_creation() {
        let config = RateLimitConfig::default();
        assert!(config.enable_metrics);
        assert!(config.enable_events);
        assert!(config.enable_auto_creation);
        assert!(!config.fail_if_not_found);
    }

    #[test]
    fn loads_defaults_from_empty_environment() {
        let config = RateLimitConfig::load("CACHEGATE_RATE_LIMIT_TEST_UNSET").unwrap();
        assert!(config.enable_auto_creation);
    }
}
