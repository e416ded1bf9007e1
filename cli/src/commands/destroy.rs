//! `zonekit destroy`: remove the recorded disposable zone.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::ExternalStateStore;
use crate::application::services::destroy_zone;

/// Run `zonekit destroy`.
///
/// Without a recorded zone nothing is contacted and no config is needed.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the zone cannot be
/// removed. The state file is left untouched in that case.
pub async fn run(app: &AppContext) -> Result<()> {
    let Some(state) = app.state_store.load_async().await? else {
        app.output.info("No zone recorded.");
        return Ok(());
    };
    let Some(zone_id) = state.zone_id.clone() else {
        app.output.info("No zone recorded.");
        return Ok(());
    };
    let cfg = app.config()?;
    let connector = app.connector(&cfg);
    let reporter = app.terminal_reporter();

    let state = destroy_zone(&connector, &cfg, &reporter, state).await?;
    drop(reporter);
    app.state_store.save_async(&state).await?;

    app.output.success(&format!("Zone {zone_id} removed."));
    Ok(())
}
