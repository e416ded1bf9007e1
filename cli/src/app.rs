//! Application context: unified state passed to every command handler.
//!
//! `AppContext` is built once from the global flags. Config is loaded lazily
//! because `status` and `destroy` on an empty record must work without one.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::ZonekitConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::keys::SshKeygenProvisioner;
use crate::infra::ssh::{SshConnector, SshSettings};
use crate::infra::state::JsonStateStore;
use crate::output::{OutputContext, TerminalReporter};

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Explicit config file path (`--config`).
    pub config: Option<PathBuf>,
    /// Explicit state file path (`--state`).
    pub state: Option<PathBuf>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Where configuration is read from.
    pub config_store: YamlConfigStore,
    /// Caller-visible state record.
    pub state_store: JsonStateStore,
    /// Local process runner shared by every adapter.
    pub runner: TokioCommandRunner,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if no state path is given and the home directory
    /// cannot be determined.
    pub fn new(flags: AppFlags) -> Result<Self> {
        let config_store = flags
            .config
            .map_or_else(YamlConfigStore::default, YamlConfigStore::with_path);
        let state_store = match flags.state {
            Some(path) => JsonStateStore::with_path(path),
            None => JsonStateStore::new()?,
        };
        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            config_store,
            state_store,
            runner: TokioCommandRunner::default(),
        })
    }

    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn config(&self) -> Result<ZonekitConfig> {
        self.config_store.load()
    }

    /// Channel connector configured from `cfg`.
    #[must_use]
    pub fn connector(&self, cfg: &ZonekitConfig) -> SshConnector<TokioCommandRunner> {
        SshConnector::new(self.runner.clone(), SshSettings::from_config(cfg))
    }

    #[must_use]
    pub fn key_provisioner(&self) -> SshKeygenProvisioner<TokioCommandRunner> {
        SshKeygenProvisioner::new(self.runner.clone())
    }

    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }
}
