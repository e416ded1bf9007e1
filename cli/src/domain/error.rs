//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

use crate::domain::zone::ZoneStatus;

// ── Channel errors ────────────────────────────────────────────────────────────

/// Failures of the secure command channel itself.
///
/// A remote command that exits non-zero is NOT a channel error; it is a
/// normal [`CommandResult`](crate::domain::command::CommandResult).
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("cannot reach {target}: {detail}")]
    Transport { target: String, detail: String },

    #[error("command on {target} timed out after {}s", timeout.as_secs())]
    Timeout { target: String, timeout: Duration },

    #[error("session to {target} has been severed")]
    Severed { target: String },

    #[error("failed to launch local ssh client: {0}")]
    Spawn(String),
}

/// A local process exceeded its deadline and was killed.
#[derive(Debug, Error)]
#[error("{program} timed out after {}s", timeout.as_secs())]
pub struct ProcessTimeout {
    pub program: String,
    pub timeout: Duration,
}

// ── Zone errors ───────────────────────────────────────────────────────────────

/// Errors raised by zone handles and the provisioning workflows.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error(
        "Control host verification failed for {address} (status {status}). \
Check control.address, control.username and control.password in the config."
    )]
    ControlHostUnreachable { address: String, status: i32 },

    #[error("Cannot determine capability tier from kernel release '{0}'.")]
    UnknownTier(String),

    #[error("zone '{zone}': {operation} failed with status {status}: {stderr}")]
    ControllerCommand {
        zone: String,
        operation: &'static str,
        status: i32,
        stderr: String,
    },

    #[error("zone '{zone}': cannot {operation} while {status}")]
    InvalidTransition {
        zone: String,
        operation: &'static str,
        status: ZoneStatus,
    },

    #[error("zone '{zone}': lifecycle operations are not permitted on the control handle")]
    ControlRole { zone: String },

    #[error("Template '{template}' is locked by another run (waited {}s).", waited.as_secs())]
    LeaseTimeout { template: String, waited: Duration },

    #[error(
        "Template '{template}' is {state} and cannot be cloned. \
Halt it, or remove it with zoneadm/zonecfg so the next run rebuilds it."
    )]
    TemplateUnusable { template: String, state: String },

    #[error("Unparseable zoneadm output: {0:?}")]
    ListParse(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("Invalid value for {key}: {value}\n\nExpected: {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ── State errors ──────────────────────────────────────────────────────────────

/// Errors related to the caller-visible state record.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid zone name in state: {0}")]
    InvalidZoneName(String),
}
