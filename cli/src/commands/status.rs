//! `zonekit status`: show the recorded zone.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ExternalStateStore;
use crate::commands::print_record;

/// Arguments for the status command.
#[derive(Args, Default)]
pub struct StatusArgs {
    /// Print the raw state record as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run `zonekit status`.
///
/// # Errors
///
/// Returns an error if the state file cannot be read.
pub async fn run(args: &StatusArgs, app: &AppContext) -> Result<()> {
    let state = app.state_store.load_async().await?.unwrap_or_default();
    if args.json {
        let out = serde_json::to_string_pretty(&state).context("JSON serialization failed")?;
        println!("{out}");
    } else {
        print_record(&state, &app.output);
    }
    Ok(())
}
