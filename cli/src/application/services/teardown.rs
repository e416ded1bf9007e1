//! Application service: disposable zone destroy use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use tracing::info;

use crate::application::ports::{ChannelConnector, ProgressReporter};
use crate::application::services::provision::{ProvisioningContext, open_control, open_zone};
use crate::application::services::zone_controller::ZoneProfile;
use crate::domain::{ExternalState, Role, ZoneStatus, ZonekitConfig};

/// Remove the zone recorded in `state` and return the state with `zone_id`
/// cleared.
///
/// A state without a `zone_id` is returned unchanged and nothing is
/// contacted. A zone that is already gone counts as destroyed.
///
/// # Errors
///
/// Returns an error if the recorded name is invalid, the control host cannot
/// be verified, or the zone controller refuses to remove the zone. The
/// state is not modified on error.
pub async fn destroy_zone<K: ChannelConnector>(
    connector: &K,
    cfg: &ZonekitConfig,
    reporter: &impl ProgressReporter,
    mut state: ExternalState,
) -> Result<ExternalState> {
    let Some(zone_id) = state.zone_id.clone() else {
        info!("no zone recorded, nothing to destroy");
        return Ok(state);
    };
    state.validate()?;

    reporter.step("verifying control host...");
    let control = open_control(connector, cfg).await?;

    let mut ctx = ProvisioningContext::new(control);
    let profile = ZoneProfile {
        address: state
            .hostname
            .clone()
            .unwrap_or_else(|| cfg.disposable.address.clone()),
        password: state
            .password
            .clone()
            .unwrap_or_else(|| cfg.disposable.password.clone()),
        authorized_key: None,
    };
    let outcome = teardown(&mut ctx, connector, cfg, reporter, &zone_id, profile).await;
    if let Err(e) = ctx.sever_all().await {
        reporter.warn(&format!("could not release every session: {e}"));
    }
    outcome?;

    state.zone_id = None;
    Ok(state)
}

async fn teardown<K: ChannelConnector>(
    ctx: &mut ProvisioningContext<K::Channel>,
    connector: &K,
    cfg: &ZonekitConfig,
    reporter: &impl ProgressReporter,
    zone_id: &str,
    profile: ZoneProfile,
) -> Result<()> {
    let zone = ctx
        .disposable
        .insert(open_zone(connector, cfg, Role::Disposable, zone_id, profile).await?);
    if zone.refresh().await? == ZoneStatus::Absent {
        reporter.warn(&format!("zone {zone_id} no longer exists"));
        return Ok(());
    }
    reporter.step(&format!("destroying zone {zone_id}..."));
    zone.destroy().await?;
    reporter.success(&format!("zone {zone_id} destroyed"));
    Ok(())
}
