//! Non-secret runtime settings: bind address for the metrics
//! server, log level, and the task config path. The YAML/flag/env precedence
//! merge itself is out of scope, this is just the concrete type those layers
//! populate, plus one helper applying the declared precedence
//! (flags > env > defaults) without a generic merge framework.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub metrics_bind_addr: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self { metrics_bind_addr: "127.0.0.1:9090".to_string(), log_level: "info".to_string() }
    }
}

impl Settings {
    /// `flag` wins over the `HYPERFLEET_*` env var, which wins over the default.
    pub fn resolve(metrics_bind_flag: Option<String>, log_level_flag: Option<String>) -> Self {
        let defaults = Settings::default();
        Settings {
            metrics_bind_addr: metrics_bind_flag
                .or_else(|| std::env::var("HYPERFLEET_METRICS_BIND_ADDR").ok())
                .unwrap_or(defaults.metrics_bind_addr),
            log_level: log_level_flag
                .or_else(|| std::env::var("HYPERFLEET_LOG_LEVEL").ok())
                .unwrap_or(defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_default() {
        let s = Settings::resolve(Some("0.0.0.0:9999".to_string()), None);
        assert_eq!(s.metrics_bind_addr, "0.0.0.0:9999");
    }

    #[test]
    fn default_applies_when_nothing_set() {
        std::env::remove_var("HYPERFLEET_LOG_LEVEL");
        let s = Settings::resolve(None, None);
        assert_eq!(s.log_level, "info");
    }
}
