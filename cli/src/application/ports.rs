//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{ChannelError, CommandResult, ExternalState, HostTarget, ZonekitConfig};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program with the instance's default timeout and capture its output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned) and
    /// the error must be a [`ProcessTimeout`](crate::domain::ProcessTimeout).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Like `run_with_timeout`, with extra environment variables for the child.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Secure Channel Ports ──────────────────────────────────────────────────────

/// An authenticated session to one host that executes one command at a time.
#[allow(async_fn_in_trait)]
pub trait SecureChannel {
    /// The (address, username, credential) triple this session is bound to.
    fn target(&self) -> &HostTarget;

    /// Run `command` remotely and wait for its exit status.
    ///
    /// A non-zero exit status is a normal result. Only failures of the
    /// session itself (unreachable host, authentication, deadline) are errors.
    async fn execute(&self, command: &str, timeout: Duration)
    -> Result<CommandResult, ChannelError>;

    /// Release the session. The remote side is not touched.
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Opens secure channels.
#[allow(async_fn_in_trait)]
pub trait ChannelConnector {
    type Channel: SecureChannel;

    /// Authenticate a new session against `target`.
    async fn connect(&self, target: &HostTarget) -> Result<Self::Channel, ChannelError>;
}

// ── Credential Port ───────────────────────────────────────────────────────────

/// Generates and persists the key pair injected into disposable zones.
#[allow(async_fn_in_trait)]
pub trait KeyProvisioner {
    /// Ensure both key files exist, generating them if absent.
    /// Returns the single-line public key.
    async fn ensure_key_pair(&self, private_key: &Path, public_key: &Path) -> Result<String>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Synchronous.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── State and Config Ports ────────────────────────────────────────────────────

/// Abstracts persistence of the caller-visible state record.
#[allow(async_fn_in_trait)]
pub trait ExternalStateStore {
    /// Load the recorded state, returning `None` if no state exists.
    async fn load_async(&self) -> Result<Option<ExternalState>>;
    /// Persist the given state.
    async fn save_async(&self, state: &ExternalState) -> Result<()>;
}

/// Abstracts loading of the configuration file.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when no file exists.
    fn load(&self) -> Result<ZonekitConfig>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
