//! `zonekit exec`: run a command on the control host.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::remote_exec::{join_command, run_on_control};

/// Arguments for the exec command.
#[derive(Args)]
#[command(trailing_var_arg = true)]
pub struct ExecArgs {
    /// Command and arguments to run on the control host
    #[arg(required = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Run a command in the control host's global zone.
///
/// Remote stdout and stderr are written to the local streams of the same
/// name; the remote exit status becomes the process exit status.
///
/// # Errors
///
/// Returns an error if the config is invalid, the control host cannot be
/// verified, or the session fails.
pub async fn run(args: &ExecArgs, app: &AppContext) -> Result<ExitCode> {
    let cfg = app.config()?;
    let connector = app.connector(&cfg);
    let result = run_on_control(&connector, &cfg, &join_command(&args.command)).await?;

    if let Some(out) = &result.stdout {
        std::io::stdout()
            .write_all(out.as_bytes())
            .context("writing stdout")?;
    }
    if let Some(err) = &result.stderr {
        std::io::stderr()
            .write_all(err.as_bytes())
            .context("writing stderr")?;
    }
    Ok(ExitCode::from(exit_byte(result.exit_status)))
}

/// Remote statuses outside `0..=255` become a generic failure.
fn exit_byte(status: i32) -> u8 {
    u8::try_from(status).unwrap_or(1)
}
