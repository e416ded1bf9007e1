//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod command;
pub mod config;
pub mod error;
pub mod ssh;
pub mod state;
pub mod zone;
pub mod zonecmd;

pub use command::CommandResult;
pub use config::{ZonekitConfig, validate_config};
pub use error::{ChannelError, ConfigError, ProcessTimeout, StateError, ZoneError};
pub use ssh::{Credential, HostTarget};
pub use state::ExternalState;
pub use zone::{CapabilityTier, Role, ZoneStatus};
