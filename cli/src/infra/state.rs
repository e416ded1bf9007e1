//! Infrastructure implementation of the `ExternalStateStore` port.
//!
//! `JsonStateStore` provides async load/save using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) so an interrupted run never leaves a
//! half-written record behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ExternalStateStore;
use crate::domain::ExternalState;

/// Environment variable overriding the default state path.
pub const STATE_ENV: &str = "ZONEKIT_STATE";

/// State file store backed by a pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Store at `$ZONEKIT_STATE`, or `~/.zonekit/state.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        if let Ok(val) = std::env::var(STATE_ENV) {
            return Ok(Self::with_path(PathBuf::from(val)));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".zonekit").join("state.json")))
    }

    /// Store at an explicit path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_sync(path: &Path) -> Result<Option<ExternalState>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Some(ExternalState::default()));
        }
        let state: ExternalState = serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        state.validate()?;
        Ok(Some(state))
    }

    fn save_sync(path: &Path, state: &ExternalState) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(state).context("serializing state")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        // the record carries the zone password
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("finalizing state file {}", path.display()))?;
        Ok(())
    }
}

impl ExternalStateStore for JsonStateStore {
    async fn load_async(&self) -> Result<Option<ExternalState>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("state load task panicked")?
    }

    async fn save_async(&self, state: &ExternalState) -> Result<()> {
        let path = self.path.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &state))
            .await
            .context("state save task panicked")?
    }
}
