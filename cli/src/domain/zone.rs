//! Zone domain types and pure classification functions.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use std::fmt;

use crate::domain::command::CommandResult;
use crate::domain::error::ZoneError;

/// Name of the always-present global zone on the control host.
pub const GLOBAL_ZONE: &str = "global";

/// Maximum length of a zone name accepted by `zonecfg`.
pub const MAX_ZONE_NAME_LEN: usize = 64;

/// Which part a handle plays in a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Control,
    Template,
    Disposable,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Control => "control",
            Role::Template => "template",
            Role::Disposable => "disposable",
        })
    }
}

/// Lifecycle status of the zone a handle is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStatus {
    /// Not queried yet.
    Unknown,
    Absent,
    Stopped,
    Running,
    /// Removed through this handle; terminal.
    Destroyed,
}

impl ZoneStatus {
    #[must_use]
    pub fn exists(self) -> bool {
        matches!(self, ZoneStatus::Stopped | ZoneStatus::Running)
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ZoneStatus::Unknown => "unknown",
            ZoneStatus::Absent => "absent",
            ZoneStatus::Stopped => "stopped",
            ZoneStatus::Running => "running",
            ZoneStatus::Destroyed => "destroyed",
        })
    }
}

/// Environment-management capability of the control host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityTier {
    /// Cannot create zones fast enough; clone a halted template instead.
    Legacy,
    /// Direct creation is fast; no template needed.
    Current,
}

impl CapabilityTier {
    /// Classify a kernel release string as printed by `uname -r`.
    ///
    /// `5.10` and older are legacy; `5.11` and newer are current.
    ///
    /// # Errors
    ///
    /// Returns an error if the release is not of the form `<major>.<minor>`.
    pub fn from_release(release: &str) -> Result<Self, ZoneError> {
        let trimmed = release.trim();
        let unknown = || ZoneError::UnknownTier(trimmed.to_string());
        let mut parts = trimmed.split('.');
        let major: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(unknown)?;
        let minor: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(unknown)?;
        Ok(if (major, minor) <= (5, 10) {
            CapabilityTier::Legacy
        } else {
            CapabilityTier::Current
        })
    }
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CapabilityTier::Legacy => "legacy",
            CapabilityTier::Current => "current",
        })
    }
}

/// One line of `zoneadm list -p` output.
///
/// Format: `id:name:state:path:uuid:brand:ip-type`. Only the first three
/// fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneListing {
    pub id: String,
    pub name: String,
    pub state: String,
}

impl ZoneListing {
    /// # Errors
    ///
    /// Returns an error if the line has fewer than three fields.
    pub fn parse(line: &str) -> Result<Self, ZoneError> {
        let mut fields = line.trim().split(':');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(id), Some(name), Some(state)) if !name.is_empty() && !state.is_empty() => {
                Ok(Self {
                    id: id.to_string(),
                    name: name.to_string(),
                    state: state.to_string(),
                })
            }
            _ => Err(ZoneError::ListParse(line.to_string())),
        }
    }

    #[must_use]
    pub fn status(&self) -> ZoneStatus {
        status_from_state(&self.state)
    }
}

/// Map a zoneadm state column to a handle status.
///
/// Anything other than `running` counts as stopped: the zone exists but is
/// not executing, which is what cloning and destroying care about.
#[must_use]
pub fn status_from_state(state: &str) -> ZoneStatus {
    if state == "running" {
        ZoneStatus::Running
    } else {
        ZoneStatus::Stopped
    }
}

/// Interpret the result of a presence query.
///
/// | exit | stderr                         | meaning                    |
/// |------|--------------------------------|----------------------------|
/// | 0    | -                              | present, state parsed      |
/// | !=0  | `No such zone` / `not found`   | absent                     |
/// | !=0  | anything else                  | `ControllerCommand` error  |
///
/// # Errors
///
/// Returns an error for unrecognised failures or unparseable output.
pub fn presence_from(zone: &str, result: &CommandResult) -> Result<ZoneStatus, ZoneError> {
    if result.success() {
        let line = result
            .stdout_str()
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| ZoneError::ListParse(String::new()))?;
        return Ok(ZoneListing::parse(line)?.status());
    }
    let stderr = result.stderr_str();
    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("no such zone") || lowered.contains("not found") {
        return Ok(ZoneStatus::Absent);
    }
    Err(ZoneError::ControllerCommand {
        zone: zone.to_string(),
        operation: "list",
        status: result.exit_status,
        stderr: stderr.trim().to_string(),
    })
}

/// Validate a zone name the way `zonecfg` does.
///
/// Names start with an alphanumeric character, continue with alphanumerics,
/// `-`, `_` or `.`, are at most 64 characters, are not `global` and do not
/// start with the reserved `SUNW` prefix.
#[must_use]
pub fn is_valid_zone_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && name.len() <= MAX_ZONE_NAME_LEN
        && name != GLOBAL_ZONE
        && !name.starts_with("SUNW")
}

/// Generate a unique disposable zone name.
///
/// Format: `<prefix>-` followed by 16 lowercase hex characters.
/// Entropy sources: nanosecond timestamp and two independent `RandomState` hashes.
#[must_use]
pub fn generate_zone_name(prefix: &str) -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    hasher.write_u64(RandomState::new().build_hasher().finish());
    hasher.write_u64(RandomState::new().build_hasher().finish());
    format!("{prefix}-{:016x}", hasher.finish())
}
