//! Sweeper configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// When disabled, turnovers are only completed on request.
    #[serde(default)]
    pub enabled: bool,

    /// Time between sweeps (milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    60_000 // 1 minute
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweeperConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.interval_ms, 60_000);
    }

    #[test]
    fn test_deserialize_config() {
        let config: SweeperConfig = toml::from_str("enabled = true").unwrap();
        assert!(config.enabled);
        assert_eq!(config.interval_ms, 60_000);
    }
}
