//! Run one ad-hoc command on the control host.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use tracing::warn;

use crate::application::ports::{ChannelConnector, SecureChannel};
use crate::application::services::provision::open_control;
use crate::domain::{CommandResult, ZonekitConfig};

/// Join argv-style words into one remote shell command, quoting each word.
#[must_use]
pub fn join_command(words: &[String]) -> String {
    words
        .iter()
        .map(|w| shell_escape::escape(w.as_str().into()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Verify the control host, run `command` there and release the session.
///
/// A non-zero remote exit status is returned in the result, not as an error.
///
/// # Errors
///
/// Returns an error if the control host cannot be verified or the session
/// fails while the command runs.
pub async fn run_on_control<K: ChannelConnector>(
    connector: &K,
    cfg: &ZonekitConfig,
    command: &str,
) -> Result<CommandResult> {
    let control = open_control(connector, cfg).await?;
    let outcome = control
        .channel()
        .execute(command, control.command_timeout())
        .await;
    if let Err(e) = control.sever().await {
        warn!(error = %e, "failed to release control session");
    }
    Ok(outcome?)
}
