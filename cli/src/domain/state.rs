//! Caller-visible record of a provisioned disposable zone.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::StateError;
use crate::domain::zone::is_valid_zone_name;

/// State persisted to `~/.zonekit/state.json` between `create` and `destroy`.
///
/// Every field is optional so a caller may hand in an empty record (`{}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalState {
    /// Name of the disposable zone, cleared by a successful destroy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Private key matching the public key injected into the zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExternalState {
    /// Validates the recorded zone name, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if `zone_id` is present but not a legal zone name.
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.zone_id {
            if !is_valid_zone_name(id) {
                return Err(StateError::InvalidZoneName(id.clone()).into());
            }
        }
        Ok(())
    }
}
