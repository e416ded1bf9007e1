//! Mutual exclusion for the template-ensure sequence.
//!
//! The lease is a directory on the control host created with `mkdir`, which
//! is atomic, so concurrent runs against the same host and template name
//! serialise on it no matter where they were started from.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::application::ports::SecureChannel;
use crate::domain::ZoneError;
use crate::domain::zonecmd;

/// How long to wait for a held lease and how often to retry.
#[derive(Debug, Clone, Copy)]
pub struct LeaseSettings {
    pub timeout: Duration,
    pub poll: Duration,
}

/// A held lease. Must be released with [`TemplateLease::release`].
#[derive(Debug)]
#[must_use = "a lease that is never released blocks every later run"]
pub struct TemplateLease {
    template: String,
}

impl TemplateLease {
    /// Take the lease for `template`, polling while another run holds it.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::LeaseTimeout`] if the lease stays held past
    /// `settings.timeout`, or a controller error if `mkdir` fails for any
    /// reason other than the lease already existing.
    pub async fn acquire(
        channel: &impl SecureChannel,
        template: &str,
        settings: LeaseSettings,
        command_timeout: Duration,
    ) -> Result<Self> {
        let started = Instant::now();
        let command = zonecmd::lease_acquire(template);
        loop {
            let result = channel.execute(&command, command_timeout).await?;
            if result.success() {
                info!(template, "template lease acquired");
                return Ok(Self {
                    template: template.to_string(),
                });
            }
            if !result.stderr_str().contains("exists") {
                return Err(ZoneError::ControllerCommand {
                    zone: template.to_string(),
                    operation: "acquire lease",
                    status: result.exit_status,
                    stderr: result.stderr_str().trim().to_string(),
                }
                .into());
            }
            let waited = started.elapsed();
            if waited >= settings.timeout {
                return Err(ZoneError::LeaseTimeout {
                    template: template.to_string(),
                    waited,
                }
                .into());
            }
            debug!(template, waited_ms = waited.as_millis(), "template lease held, waiting");
            tokio::time::sleep(settings.poll).await;
        }
    }

    /// Give the lease back.
    ///
    /// # Errors
    ///
    /// Returns an error if the lease directory cannot be removed.
    pub async fn release(self, channel: &impl SecureChannel, command_timeout: Duration) -> Result<()> {
        let result = channel
            .execute(&zonecmd::lease_release(&self.template), command_timeout)
            .await?;
        if !result.success() {
            warn!(template = %self.template, stderr = %result.stderr_str(), "lease release failed");
            return Err(ZoneError::ControllerCommand {
                zone: self.template,
                operation: "release lease",
                status: result.exit_status,
                stderr: result.stderr_str().trim().to_string(),
            }
            .into());
        }
        info!(template = %self.template, "template lease released");
        Ok(())
    }
}
