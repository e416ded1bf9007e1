//! `zonekit create`: provision a fresh disposable zone.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::ExternalStateStore;
use crate::application::services::create_zone;
use crate::commands::print_record;
use crate::domain::ExternalState;

/// Run `zonekit create`.
///
/// # Errors
///
/// Returns an error if a zone is already recorded, the configuration is
/// invalid, or provisioning fails.
pub async fn run(app: &AppContext) -> Result<()> {
    let state = app.state_store.load_async().await?.unwrap_or_default();
    if let Some(existing) = &state.zone_id {
        anyhow::bail!(
            "zone {existing} is already recorded in {}; run `zonekit destroy` first",
            app.state_store.path().display()
        );
    }
    let cfg = app.config()?;
    let connector = app.connector(&cfg);
    let keys = app.key_provisioner();
    let reporter = app.terminal_reporter();

    let state: ExternalState = create_zone(&connector, &keys, &cfg, &reporter, state).await?;
    drop(reporter);
    app.state_store.save_async(&state).await?;

    print_record(&state, &app.output);
    Ok(())
}
