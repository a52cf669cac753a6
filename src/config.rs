//! Configuration management for mau-model.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (MAU_MODEL_STAGES, MAU_MODEL_PHV_POOL_LIMIT)
//! 2. Project-local config file (`./mau-model.toml`)
//! 3. User config file (`~/.config/mau-model/config.toml`)
//! 4. Built-in defaults
//!
//! Only the command-line tool reads this; library users construct a
//! `ChipModel` directly.
//!
//! # Config File Format
//!
//! ```toml
//! # mau-model.toml
//!
//! # Number of MAU stages (default 12)
//! stages = 12
//!
//! # Maximum PHVs in flight (default: unbounded)
//! phv_pool_limit = 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::device::chip_config::{ChipConfig, CustomConfig, TofinoLikeConfig, DEFAULT_STAGES};
use crate::device::state::ChipModel;

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// mau-model configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Number of MAU stages.
    pub stages: Option<usize>,

    /// Maximum number of PHVs allocated at once.
    pub phv_pool_limit: Option<usize>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `mau-model.toml`
    /// 3. User config `~/.config/mau-model/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    /// Stage count, with fallback to the default chip.
    pub fn stages(&self) -> usize {
        self.stages.unwrap_or(DEFAULT_STAGES)
    }

    /// Chip configuration described by this config.
    pub fn chip(&self) -> Arc<dyn ChipConfig> {
        match self.stages {
            Some(stages) if stages != DEFAULT_STAGES => Arc::new(CustomConfig::with_stages(stages)),
            _ => Arc::new(TofinoLikeConfig),
        }
    }

    /// Build a chip model from this config.
    pub fn build_model(&self) -> ChipModel {
        ChipModel::with_pool_limit(self.chip(), self.phv_pool_limit)
    }

    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    fn load_local_config() -> Option<Self> {
        Self::load_from_file(Path::new("mau-model.toml"))
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    fn merge(&mut self, other: Self) {
        if other.stages.is_some() {
            self.stages = other.stages;
        }
        if other.phv_pool_limit.is_some() {
            self.phv_pool_limit = other.phv_pool_limit;
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(stages) = env_usize("MAU_MODEL_STAGES") {
            log::info!("Using MAU_MODEL_STAGES from environment: {}", stages);
            self.stages = Some(stages);
        }
        if let Some(limit) = env_usize("MAU_MODEL_PHV_POOL_LIMIT") {
            log::info!("Using MAU_MODEL_PHV_POOL_LIMIT from environment: {}", limit);
            self.phv_pool_limit = Some(limit);
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mau-model").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# mau-model configuration
# Place this file at ~/.config/mau-model/config.toml or ./mau-model.toml

# Number of MAU stages (1-32, default 12)
stages = 12

# Maximum PHVs in flight (optional, default unbounded)
# phv_pool_limit = 64
"#
        .to_string()
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring {}={:?}: {}", name, raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.stages(), 12);
        assert_eq!(config.chip().name(), TofinoLikeConfig.name());
        let model = config.build_model();
        assert_eq!(model.stages().len(), 12);
        assert_eq!(model.pool().limit(), None);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config {
            stages: Some(4),
            phv_pool_limit: Some(8),
        };

        let overlay = Config {
            stages: None,
            phv_pool_limit: Some(16),
        };

        base.merge(overlay);

        // stages unchanged (overlay was None)
        assert_eq!(base.stages, Some(4));
        assert_eq!(base.phv_pool_limit, Some(16));
    }

    #[test]
    fn test_custom_stage_count() {
        let config = Config { stages: Some(3), phv_pool_limit: Some(2) };
        let model = config.build_model();
        assert_eq!(model.stages().len(), 3);
        assert_eq!(model.pool().limit(), Some(2));
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = Config::sample_config();
        let config: Config = toml::from_str(&sample).expect("Sample config should parse");
        assert_eq!(config.stages, Some(12));
        assert_eq!(config.phv_pool_limit, None);
    }
}
