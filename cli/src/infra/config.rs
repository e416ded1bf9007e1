//! Infrastructure implementation of the `ConfigStore` port.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::{ZonekitConfig, validate_config};

/// Environment variable overriding the default config path.
pub const CONFIG_ENV: &str = "ZONEKIT_CONFIG";

/// Production implementation of `ConfigStore` that reads a YAML file on disk.
#[derive(Debug, Clone, Default)]
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Read from `path` instead of the default location.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            explicit: Some(path),
        }
    }

    /// Parse without validating. `~/` in key paths is expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_unvalidated(&self) -> Result<ZonekitConfig> {
        let path = self.path()?;
        let cfg = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?
        } else {
            ZonekitConfig::default()
        };
        match dirs::home_dir() {
            Some(home) => Ok(cfg.with_home(&home)),
            None => Ok(cfg),
        }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ZonekitConfig> {
        let cfg = self.load_unvalidated()?;
        let path = self.path()?;
        validate_config(&cfg).with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".zonekit").join("config.yaml"))
    }
}
