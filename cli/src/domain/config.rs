//! Domain types and validators for zonekit configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::ssh::{Credential, HostTarget};
use crate::domain::zone::is_valid_zone_name;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.zonekit/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ZonekitConfig {
    pub control: ControlConfig,
    pub template: TemplateConfig,
    pub disposable: DisposableConfig,
    pub keys: KeysConfig,
    pub zones: ZonesConfig,
    pub timeouts: TimeoutsConfig,
    pub ssh: SshOptions,
}

/// The control host (global zone) every session connects to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub address: String,
    pub port: u16,
    pub username: String,
    /// Uses key/agent authentication when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 22,
            username: "root".to_string(),
            password: None,
        }
    }
}

/// The reusable template zone used on legacy hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub name: String,
    pub password: String,
    pub address: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            name: "zonekit-template".to_string(),
            password: String::new(),
            address: String::new(),
        }
    }
}

/// Settings applied to every disposable zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisposableConfig {
    pub address: String,
    pub password: String,
    pub name_prefix: String,
    pub username: String,
}

impl Default for DisposableConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            password: String::new(),
            name_prefix: "zonekit".to_string(),
            username: "root".to_string(),
        }
    }
}

/// Key pair injected into disposable zones. `~/` is expanded on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            private_key: PathBuf::from("~/.zonekit/id_rsa"),
            public_key: PathBuf::from("~/.zonekit/id_rsa.pub"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    /// Parent directory of zone paths on the control host.
    pub root: String,
    /// Interface zone addresses are plumbed on.
    pub interface: String,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            root: "/zones".to_string(),
            interface: "net0".to_string(),
        }
    }
}

/// All timeouts are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub connect_secs: u64,
    pub command_secs: u64,
    pub lease_timeout_secs: u64,
    pub lease_poll_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connect_secs: 30,
            command_secs: 1800,
            lease_timeout_secs: 3600,
            lease_poll_secs: 10,
        }
    }
}

impl TimeoutsConfig {
    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    #[must_use]
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub fn lease_timeout(&self) -> Duration {
        Duration::from_secs(self.lease_timeout_secs)
    }

    #[must_use]
    pub fn lease_poll(&self) -> Duration {
        Duration::from_secs(self.lease_poll_secs)
    }
}

/// Client-side ssh behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SshOptions {
    /// Request a pseudo-terminal for every command. A pty merges remote
    /// stderr into stdout.
    pub request_pty: bool,
    pub strict_host_key_checking: bool,
}

impl ZonekitConfig {
    /// Session target for the control host.
    #[must_use]
    pub fn control_target(&self) -> HostTarget {
        HostTarget {
            address: self.control.address.clone(),
            port: self.control.port,
            username: self.control.username.clone(),
            credential: self
                .control
                .password
                .clone()
                .map_or(Credential::Agent, Credential::Password),
        }
    }

    /// Replace a leading `~` in key paths with `home`.
    #[must_use]
    pub fn with_home(mut self, home: &Path) -> Self {
        self.keys.private_key = expand_home(&self.keys.private_key, home);
        self.keys.public_key = expand_home(&self.keys.public_key, home);
        self
    }
}

/// Expand a leading `~` component.
#[must_use]
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && prefix.len() <= 32
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Validates a loaded configuration.
///
/// # Errors
///
/// Returns the first violated rule as a [`ConfigError`].
pub fn validate_config(cfg: &ZonekitConfig) -> Result<()> {
    if cfg.control.address.trim().is_empty() {
        return Err(ConfigError::Empty { key: "control.address" }.into());
    }
    if cfg.control.port == 0 {
        return Err(ConfigError::InvalidValue {
            key: "control.port",
            value: "0".to_string(),
            expected: "a port between 1 and 65535",
        }
        .into());
    }
    if cfg.control.username.trim().is_empty() {
        return Err(ConfigError::Empty { key: "control.username" }.into());
    }
    if cfg.disposable.address.trim().is_empty() {
        return Err(ConfigError::Empty { key: "disposable.address" }.into());
    }
    if !is_valid_prefix(&cfg.disposable.name_prefix) {
        return Err(ConfigError::InvalidValue {
            key: "disposable.name_prefix",
            value: cfg.disposable.name_prefix.clone(),
            expected: "[a-z][a-z0-9-]{0,31}",
        }
        .into());
    }
    if !is_valid_zone_name(&cfg.template.name) {
        return Err(ConfigError::InvalidValue {
            key: "template.name",
            value: cfg.template.name.clone(),
            expected: "a zone name (alphanumeric start, [A-Za-z0-9._-], at most 64 chars)",
        }
        .into());
    }
    let t = &cfg.timeouts;
    for (key, value) in [
        ("timeouts.connect_secs", t.connect_secs),
        ("timeouts.command_secs", t.command_secs),
        ("timeouts.lease_timeout_secs", t.lease_timeout_secs),
        ("timeouts.lease_poll_secs", t.lease_poll_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                key,
                value: "0".to_string(),
                expected: "a positive number of seconds",
            }
            .into());
        }
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
