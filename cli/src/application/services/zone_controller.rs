//! Zone controller handle: one session bound to one zone on the control host.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//!
//! A handle carries the last observed [`ZoneStatus`]. Lifecycle operations
//! check the source status, issue the zone controller commands and return the
//! new status. Queries (`refresh`, `exists`, `running`) always go to the host.

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::application::ports::SecureChannel;
use crate::domain::zone::{self, GLOBAL_ZONE, ZoneListing};
use crate::domain::ssh::shadow_hash;
use crate::domain::zonecmd::{self, ZoneDefinition};
use crate::domain::{CapabilityTier, CommandResult, Role, ZoneError, ZoneStatus, ZonekitConfig};

/// Status reported by `verify_connection` when the session itself failed.
pub const UNREACHABLE_STATUS: i32 = 255;

/// Host-side settings shared by every handle of a run.
#[derive(Debug, Clone)]
pub struct HandleSettings {
    pub command_timeout: Duration,
    pub zone_root: String,
    pub interface: String,
}

impl HandleSettings {
    #[must_use]
    pub fn from_config(cfg: &ZonekitConfig) -> Self {
        Self {
            command_timeout: cfg.timeouts.command(),
            zone_root: cfg.zones.root.clone(),
            interface: cfg.zones.interface.clone(),
        }
    }
}

/// Network identity and credentials given to a zone when it is provisioned.
#[derive(Clone)]
pub struct ZoneProfile {
    pub address: String,
    pub password: String,
    pub authorized_key: Option<String>,
}

impl std::fmt::Debug for ZoneProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneProfile")
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .field("authorized_key", &self.authorized_key.is_some())
            .finish()
    }
}

/// A handle bound to exactly one zone (or to the global zone for the control role).
pub struct ZoneHandle<C: SecureChannel> {
    channel: C,
    name: String,
    role: Role,
    profile: Option<ZoneProfile>,
    settings: HandleSettings,
    status: ZoneStatus,
    /// Raw zoneadm state from the last query, e.g. `configured` or `installed`.
    listed_state: Option<String>,
    tier: Option<CapabilityTier>,
}

impl<C: SecureChannel> ZoneHandle<C> {
    /// Handle for the control host itself.
    pub fn control(channel: C, settings: HandleSettings) -> Self {
        Self {
            channel,
            name: GLOBAL_ZONE.to_string(),
            role: Role::Control,
            profile: None,
            settings,
            status: ZoneStatus::Running,
            listed_state: None,
            tier: None,
        }
    }

    /// Handle for a template or disposable zone managed through `channel`.
    pub fn zone(
        channel: C,
        role: Role,
        name: &str,
        profile: ZoneProfile,
        settings: HandleSettings,
    ) -> Self {
        Self {
            channel,
            name: name.to_string(),
            role,
            profile: Some(profile),
            settings,
            status: ZoneStatus::Unknown,
            listed_state: None,
            tier: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Last observed status; does not query the host.
    pub fn status(&self) -> ZoneStatus {
        self.status
    }

    /// Raw zoneadm state from the last query or transition, e.g. `incomplete`.
    pub fn listed_state(&self) -> Option<&str> {
        self.listed_state.as_deref()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn command_timeout(&self) -> Duration {
        self.settings.command_timeout
    }

    // ── Control host operations ──────────────────────────────────────────────

    /// Prove the session authenticates. Returns `0` when reachable.
    pub async fn verify_connection(&self) -> i32 {
        match self
            .channel
            .execute(&zonecmd::reachability_check(), self.settings.command_timeout)
            .await
        {
            Ok(result) => result.exit_status,
            Err(e) => {
                warn!(host = %self.channel.target(), error = %e, "control host check failed");
                UNREACHABLE_STATUS
            }
        }
    }

    /// Classify the host once; later calls return the cached tier.
    ///
    /// # Errors
    ///
    /// Returns an error if `uname -r` fails or prints an unknown release.
    pub async fn detect_capability_tier(&mut self) -> Result<CapabilityTier> {
        if let Some(tier) = self.tier {
            return Ok(tier);
        }
        let result = self
            .checked("detect tier", &zonecmd::uname_release())
            .await?;
        let tier = CapabilityTier::from_release(result.stdout_str())?;
        info!(host = %self.channel.target(), %tier, "capability tier detected");
        self.tier = Some(tier);
        Ok(tier)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Query the host for this zone's current status.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unrecognised zoneadm failure.
    pub async fn refresh(&mut self) -> Result<ZoneStatus> {
        self.ensure_zone_role()?;
        let result = self.exec("list", &zonecmd::list(&self.name)).await?;
        let status = zone::presence_from(&self.name, &result)?;
        self.listed_state = if result.success() {
            result
                .stdout_str()
                .lines()
                .find_map(|l| ZoneListing::parse(l).ok())
                .map(|l| l.state)
        } else {
            None
        };
        debug!(zone = %self.name, %status, "zone status refreshed");
        self.status = status;
        Ok(status)
    }

    /// # Errors
    ///
    /// See [`ZoneHandle::refresh`].
    pub async fn exists(&mut self) -> Result<bool> {
        Ok(self.refresh().await?.exists())
    }

    /// # Errors
    ///
    /// See [`ZoneHandle::refresh`].
    pub async fn running(&mut self) -> Result<bool> {
        Ok(self.refresh().await? == ZoneStatus::Running)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Configure, install and boot a brand-new zone under this handle's name.
    ///
    /// Requires the zone to be known absent. Ends `Running`.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid source status or a failed command. A
    /// failure part-way leaves the status `Unknown`.
    pub async fn create(&mut self) -> Result<ZoneStatus> {
        self.require("create", &[ZoneStatus::Absent])?;
        let profile = self.profile()?.clone();
        info!(zone = %self.name, role = %self.role, "creating zone");
        self.status = ZoneStatus::Unknown;
        let def = self.definition(&profile);
        self.checked("configure", &zonecmd::configure(&def)).await?;
        self.checked("install", &zonecmd::install(&self.name)).await?;
        self.boot_and_inject(&profile).await?;
        self.set_running();
        Ok(self.status)
    }

    /// Provision this zone as a copy of `template`.
    ///
    /// Requires this zone absent and the template stopped. Ends `Running`.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid source status or a failed command.
    pub async fn clone_from<T: SecureChannel>(
        &mut self,
        template: &ZoneHandle<T>,
    ) -> Result<ZoneStatus> {
        self.require("clone", &[ZoneStatus::Absent])?;
        if template.status != ZoneStatus::Stopped {
            return Err(ZoneError::InvalidTransition {
                zone: template.name.clone(),
                operation: "serve as clone source",
                status: template.status,
            }
            .into());
        }
        let profile = self.profile()?.clone();
        info!(zone = %self.name, template = %template.name, "cloning zone");
        self.status = ZoneStatus::Unknown;
        let def = self.definition(&profile);
        self.checked("configure", &zonecmd::configure_from(&def, &template.name))
            .await?;
        self.checked("clone", &zonecmd::clone(&self.name, &template.name))
            .await?;
        self.boot_and_inject(&profile).await?;
        self.set_running();
        Ok(self.status)
    }

    /// Stop a running zone. Ends `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone is not known to be running or halt fails.
    pub async fn halt(&mut self) -> Result<ZoneStatus> {
        self.require("halt", &[ZoneStatus::Running])?;
        info!(zone = %self.name, "halting zone");
        self.checked("halt", &zonecmd::halt(&self.name)).await?;
        self.status = ZoneStatus::Stopped;
        self.listed_state = Some("installed".to_string());
        Ok(self.status)
    }

    /// Irreversibly remove the zone. Ends `Destroyed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone is not known to exist or a command fails.
    pub async fn destroy(&mut self) -> Result<ZoneStatus> {
        self.require("destroy", &[ZoneStatus::Running, ZoneStatus::Stopped])?;
        info!(zone = %self.name, "destroying zone");
        let listed = self.listed_state.take();
        // `ready` and the shutdown states still hold a zone platform
        let needs_halt = self.status == ZoneStatus::Running
            || matches!(listed.as_deref(), Some("ready" | "shutting_down" | "down"));
        // only a merely `configured` zone has nothing to uninstall
        let needs_uninstall = listed.as_deref() != Some("configured");
        self.status = ZoneStatus::Unknown;
        if needs_halt {
            self.checked("halt", &zonecmd::halt(&self.name)).await?;
        }
        if needs_uninstall {
            self.checked("uninstall", &zonecmd::uninstall(&self.name))
                .await?;
        }
        self.checked("delete", &zonecmd::delete(&self.name)).await?;
        self.status = ZoneStatus::Destroyed;
        Ok(self.status)
    }

    /// Release the session without touching the zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be closed cleanly.
    pub async fn sever(self) -> Result<()> {
        debug!(zone = %self.name, role = %self.role, "severing handle");
        self.channel.close().await?;
        Ok(())
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn set_running(&mut self) {
        self.status = ZoneStatus::Running;
        self.listed_state = Some("running".to_string());
    }

    async fn boot_and_inject(&self, profile: &ZoneProfile) -> Result<()> {
        self.checked("boot", &zonecmd::boot(&self.name)).await?;
        let password_hash = shadow_hash(&profile.password)?;
        self.checked(
            "inject credentials",
            &zonecmd::inject_credentials(
                &self.name,
                &password_hash,
                profile.authorized_key.as_deref(),
            ),
        )
        .await?;
        Ok(())
    }

    fn definition<'a>(&'a self, profile: &'a ZoneProfile) -> ZoneDefinition<'a> {
        ZoneDefinition {
            name: &self.name,
            address: &profile.address,
            zone_root: &self.settings.zone_root,
            interface: &self.settings.interface,
        }
    }

    fn profile(&self) -> Result<&ZoneProfile> {
        self.profile.as_ref().ok_or_else(|| {
            ZoneError::ControlRole {
                zone: self.name.clone(),
            }
            .into()
        })
    }

    fn ensure_zone_role(&self) -> Result<()> {
        if self.role == Role::Control {
            return Err(ZoneError::ControlRole {
                zone: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn require(&self, operation: &'static str, allowed: &[ZoneStatus]) -> Result<()> {
        self.ensure_zone_role()?;
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(ZoneError::InvalidTransition {
                zone: self.name.clone(),
                operation,
                status: self.status,
            }
            .into())
        }
    }

    async fn exec(&self, operation: &'static str, command: &str) -> Result<CommandResult> {
        debug!(zone = %self.name, operation, "zone controller command");
        let result = self
            .channel
            .execute(command, self.settings.command_timeout)
            .await?;
        debug!(zone = %self.name, operation, exit = result.exit_status, "command finished");
        Ok(result)
    }

    /// Run a command that must exit 0.
    async fn checked(&self, operation: &'static str, command: &str) -> Result<CommandResult> {
        let result = self.exec(operation, command).await?;
        if !result.success() {
            return Err(ZoneError::ControllerCommand {
                zone: self.name.clone(),
                operation,
                status: result.exit_status,
                stderr: result.stderr_str().trim().to_string(),
            }
            .into());
        }
        Ok(result)
    }
}
