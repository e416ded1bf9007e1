//! Application service: disposable zone create use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.
//!
//! Workflow: ensure key pair → verify control host → detect tier →
//! (legacy: ensure halted template under lease, clone) | (current: create) →
//! record state → sever every handle.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::application::ports::{ChannelConnector, KeyProvisioner, ProgressReporter, SecureChannel};
use crate::application::services::template_lease::{LeaseSettings, TemplateLease};
use crate::application::services::zone_controller::{
    HandleSettings, UNREACHABLE_STATUS, ZoneHandle, ZoneProfile,
};
use crate::domain::zone::generate_zone_name;
use crate::domain::zonecmd::lease_path;
use crate::domain::{CapabilityTier, ExternalState, Role, ZoneError, ZoneStatus, ZonekitConfig};

/// Every handle opened during one run.
///
/// Handles are only ever reachable through this record, so cleanup always
/// knows exactly which sessions exist.
pub struct ProvisioningContext<C: SecureChannel> {
    pub control: ZoneHandle<C>,
    pub template: Option<ZoneHandle<C>>,
    pub disposable: Option<ZoneHandle<C>>,
}

impl<C: SecureChannel> ProvisioningContext<C> {
    pub fn new(control: ZoneHandle<C>) -> Self {
        Self {
            control,
            template: None,
            disposable: None,
        }
    }

    /// Sever disposable, then template, then control.
    ///
    /// Every handle is attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the first session that failed to close.
    pub async fn sever_all(self) -> Result<()> {
        let mut first_err = None;
        for handle in [self.disposable, self.template, Some(self.control)]
            .into_iter()
            .flatten()
        {
            let name = handle.name().to_string();
            if let Err(e) = handle.sever().await {
                warn!(zone = %name, error = %e, "failed to sever handle");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Open and verify a handle to the control host.
///
/// # Errors
///
/// Returns [`ZoneError::ControlHostUnreachable`] if the session cannot be
/// opened or the reachability check does not exit 0.
pub async fn open_control<K: ChannelConnector>(
    connector: &K,
    cfg: &ZonekitConfig,
) -> Result<ZoneHandle<K::Channel>> {
    let target = cfg.control_target();
    let unreachable = |status| ZoneError::ControlHostUnreachable {
        address: target.address.clone(),
        status,
    };
    let channel = connector
        .connect(&target)
        .await
        .map_err(|e| anyhow::Error::new(e).context(unreachable(UNREACHABLE_STATUS)))?;
    let control = ZoneHandle::control(channel, HandleSettings::from_config(cfg));
    let status = control.verify_connection().await;
    if status != 0 {
        if let Err(e) = control.sever().await {
            warn!(error = %e, "failed to release unverified control session");
        }
        return Err(unreachable(status).into());
    }
    info!(host = %target, "control host verified");
    Ok(control)
}

/// Open a handle bound to a template or disposable zone.
///
/// # Errors
///
/// Returns an error if a session to the control host cannot be opened.
pub async fn open_zone<K: ChannelConnector>(
    connector: &K,
    cfg: &ZonekitConfig,
    role: Role,
    name: &str,
    profile: ZoneProfile,
) -> Result<ZoneHandle<K::Channel>> {
    let channel = connector
        .connect(&cfg.control_target())
        .await
        .with_context(|| format!("opening session for {role} zone '{name}'"))?;
    Ok(ZoneHandle::zone(
        channel,
        role,
        name,
        profile,
        HandleSettings::from_config(cfg),
    ))
}

/// Provision a fresh disposable zone and return the populated state record.
///
/// # Errors
///
/// Returns an error if the key pair cannot be provisioned, the control host
/// cannot be verified, or any remote step fails. No remote rollback is
/// attempted; sessions are always released.
pub async fn create_zone<K: ChannelConnector>(
    connector: &K,
    keys: &impl KeyProvisioner,
    cfg: &ZonekitConfig,
    reporter: &impl ProgressReporter,
    state: ExternalState,
) -> Result<ExternalState> {
    reporter.step("checking key pair...");
    let public_key = keys
        .ensure_key_pair(&cfg.keys.private_key, &cfg.keys.public_key)
        .await
        .context("provisioning key pair")?;

    reporter.step("verifying control host...");
    let control = open_control(connector, cfg).await?;
    reporter.success("control host verified");

    let mut ctx = ProvisioningContext::new(control);
    let outcome = provision(&mut ctx, connector, cfg, reporter, public_key).await;
    if let Err(e) = ctx.sever_all().await {
        reporter.warn(&format!("could not release every session: {e}"));
    }
    let zone_id = outcome?;

    reporter.success(&format!("zone {zone_id} ready"));
    Ok(ExternalState {
        zone_id: Some(zone_id),
        hostname: Some(cfg.disposable.address.clone()),
        username: Some(cfg.disposable.username.clone()),
        password: Some(cfg.disposable.password.clone()),
        ssh_key: Some(cfg.keys.private_key.clone()),
        created_at: Some(Utc::now()),
        ..state
    })
}

async fn provision<K: ChannelConnector>(
    ctx: &mut ProvisioningContext<K::Channel>,
    connector: &K,
    cfg: &ZonekitConfig,
    reporter: &impl ProgressReporter,
    public_key: String,
) -> Result<String> {
    reporter.step("detecting capability tier...");
    let tier = ctx.control.detect_capability_tier().await?;

    let name = generate_zone_name(&cfg.disposable.name_prefix);
    let profile = ZoneProfile {
        address: cfg.disposable.address.clone(),
        password: cfg.disposable.password.clone(),
        authorized_key: Some(public_key),
    };

    match tier {
        CapabilityTier::Legacy => {
            legacy_path(ctx, connector, cfg, reporter, &name, profile).await?;
        }
        CapabilityTier::Current => {
            reporter.step(&format!("creating zone {name}..."));
            let disposable = ctx.disposable.insert(
                open_zone(connector, cfg, Role::Disposable, &name, profile).await?,
            );
            disposable.refresh().await?;
            disposable.create().await?;
        }
    }
    Ok(name)
}

async fn legacy_path<K: ChannelConnector>(
    ctx: &mut ProvisioningContext<K::Channel>,
    connector: &K,
    cfg: &ZonekitConfig,
    reporter: &impl ProgressReporter,
    name: &str,
    profile: ZoneProfile,
) -> Result<()> {
    let template_profile = ZoneProfile {
        address: cfg.template.address.clone(),
        password: cfg.template.password.clone(),
        authorized_key: None,
    };
    let template = ctx.template.insert(
        open_zone(
            connector,
            cfg,
            Role::Template,
            &cfg.template.name,
            template_profile,
        )
        .await?,
    );

    reporter.step("waiting for template lease...");
    let timeout = ctx.control.command_timeout();
    let settings = LeaseSettings {
        timeout: cfg.timeouts.lease_timeout(),
        poll: cfg.timeouts.lease_poll(),
    };
    let lease = TemplateLease::acquire(ctx.control.channel(), &cfg.template.name, settings, timeout)
        .await?;

    let outcome = clone_under_lease(
        template,
        &mut ctx.disposable,
        connector,
        cfg,
        reporter,
        name,
        profile,
    )
    .await;
    let released = lease.release(ctx.control.channel(), timeout).await;
    outcome?;
    // The zone exists now and must be recorded even if the lease is stuck.
    if let Err(e) = released {
        warn!(template = %cfg.template.name, error = %e, "template lease not released");
        reporter.warn(&format!(
            "could not release the template lease ({e:#}); remove {} on the control host",
            lease_path(&cfg.template.name)
        ));
    }
    Ok(())
}

async fn clone_under_lease<K: ChannelConnector>(
    template: &mut ZoneHandle<K::Channel>,
    slot: &mut Option<ZoneHandle<K::Channel>>,
    connector: &K,
    cfg: &ZonekitConfig,
    reporter: &impl ProgressReporter,
    name: &str,
    profile: ZoneProfile,
) -> Result<()> {
    ensure_template(template, reporter).await?;

    reporter.step(&format!("cloning zone {name} from {}...", template.name()));
    let disposable =
        slot.insert(open_zone(connector, cfg, Role::Disposable, name, profile).await?);
    disposable.refresh().await?;
    disposable.clone_from(template).await?;
    Ok(())
}

/// Make sure the template exists, is fully installed and is halted.
///
/// A template left `configured` or `incomplete` by an interrupted first run
/// is removed and built again. Any other state that cannot serve as a clone
/// source is reported as [`ZoneError::TemplateUnusable`].
///
/// # Errors
///
/// Returns an error if the template cannot be queried, rebuilt or halted.
pub async fn ensure_template<C: SecureChannel>(
    template: &mut ZoneHandle<C>,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let mut status = template.refresh().await?;
    if matches!(template.listed_state(), Some("configured" | "incomplete")) {
        reporter.warn(&format!(
            "template {} is {}, rebuilding it",
            template.name(),
            template.listed_state().unwrap_or_default()
        ));
        template.destroy().await?;
        status = template.refresh().await?;
    }
    match status {
        ZoneStatus::Absent => {
            reporter.step(&format!(
                "creating template {} (first run only)...",
                template.name()
            ));
            template.create().await?;
            template.halt().await?;
            reporter.success("template created");
        }
        ZoneStatus::Running => {
            reporter.step(&format!("halting template {}...", template.name()));
            template.halt().await?;
        }
        _ if template.listed_state() == Some("installed") => {}
        _ => {
            return Err(ZoneError::TemplateUnusable {
                template: template.name().to_string(),
                state: template.listed_state().unwrap_or("unknown").to_string(),
            }
            .into());
        }
    }
    Ok(())
}
