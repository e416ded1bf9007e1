//! Infrastructure implementation of the secure channel ports on top of the
//! system OpenSSH client.
//!
//! `SshConnector` hands out `SshChannel`s. Each channel owns a private
//! directory holding an OpenSSH control socket: the first command becomes the
//! multiplexing master (`ControlMaster=auto`, `ControlPersist=yes`) and every
//! later command of the same channel rides on the authenticated session.
//! `close()` stops the master and removes the directory.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::application::ports::{ChannelConnector, CommandRunner, SecureChannel};
use crate::domain::config::{SshOptions, ZonekitConfig};
use crate::domain::{ChannelError, CommandResult, Credential, HostTarget, ProcessTimeout};

/// Exit status OpenSSH reserves for its own failures.
pub const SSH_TRANSPORT_STATUS: i32 = 255;

/// Environment variable `sshpass -e` reads the password from.
const SSHPASS_ENV: &str = "SSHPASS";

/// Client settings shared by every channel a connector opens.
#[derive(Debug, Clone)]
pub struct SshSettings {
    pub connect_timeout: Duration,
    pub request_pty: bool,
    pub strict_host_key_checking: bool,
}

impl SshSettings {
    #[must_use]
    pub fn from_config(cfg: &ZonekitConfig) -> Self {
        let SshOptions {
            request_pty,
            strict_host_key_checking,
        } = cfg.ssh;
        Self {
            connect_timeout: cfg.timeouts.connect(),
            request_pty,
            strict_host_key_checking,
        }
    }
}

/// Opens [`SshChannel`]s that share one `CommandRunner`.
#[derive(Debug, Clone)]
pub struct SshConnector<R: CommandRunner + Clone> {
    runner: R,
    settings: SshSettings,
}

impl<R: CommandRunner + Clone> SshConnector<R> {
    pub fn new(runner: R, settings: SshSettings) -> Self {
        Self { runner, settings }
    }
}

impl<R: CommandRunner + Clone> ChannelConnector for SshConnector<R> {
    type Channel = SshChannel<R>;

    async fn connect(&self, target: &HostTarget) -> Result<SshChannel<R>, ChannelError> {
        let dir = tempfile::Builder::new()
            .prefix("zonekit-ssh-")
            .tempdir()
            .map_err(|e| ChannelError::Spawn(format!("creating control socket directory: {e}")))?;
        debug!(host = %target, dir = %dir.path().display(), "ssh channel opened");
        Ok(SshChannel {
            control_path: dir.path().join("ctl"),
            socket_dir: Mutex::new(Some(dir)),
            target: target.clone(),
            runner: self.runner.clone(),
            settings: self.settings.clone(),
            closed: AtomicBool::new(false),
        })
    }
}

/// One authenticated ssh session bound to a [`HostTarget`].
#[derive(Debug)]
pub struct SshChannel<R: CommandRunner> {
    target: HostTarget,
    runner: R,
    settings: SshSettings,
    control_path: PathBuf,
    socket_dir: Mutex<Option<TempDir>>,
    closed: AtomicBool,
}

impl<R: CommandRunner> SshChannel<R> {
    /// Options common to every invocation against this channel's master.
    fn session_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.target.port.to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.settings.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path.display()),
            "-o".to_string(),
            "ControlPersist=yes".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
        ];
        if self.settings.strict_host_key_checking {
            args.extend(["-o".to_string(), "StrictHostKeyChecking=yes".to_string()]);
        } else {
            args.extend([
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                "-o".to_string(),
                "UserKnownHostsFile=/dev/null".to_string(),
            ]);
        }
        match &self.target.credential {
            Credential::Password(_) => args.extend([
                "-o".to_string(),
                "PreferredAuthentications=password,keyboard-interactive".to_string(),
                "-o".to_string(),
                "PubkeyAuthentication=no".to_string(),
            ]),
            Credential::KeyFile(path) => args.extend([
                "-i".to_string(),
                path.display().to_string(),
                "-o".to_string(),
                "IdentitiesOnly=yes".to_string(),
                "-o".to_string(),
                "BatchMode=yes".to_string(),
            ]),
            Credential::Agent => {
                args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
            }
        }
        args
    }

    /// Full argument vector for running `command` remotely.
    fn command_args(&self, command: &str) -> Vec<String> {
        let mut args = self.session_args();
        args.push(if self.settings.request_pty { "-tt" } else { "-T" }.to_string());
        args.push(self.target.destination());
        args.push("--".to_string());
        args.push(command.to_string());
        args
    }

    /// Run `ssh <args>`, wrapped in `sshpass -e` for password credentials.
    async fn invoke(&self, args: &[String], timeout: Duration) -> anyhow::Result<Output> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match &self.target.credential {
            Credential::Password(password) => {
                let mut wrapped = vec!["-e", "ssh"];
                wrapped.extend_from_slice(&args);
                self.runner
                    .run_with_env("sshpass", &wrapped, &[(SSHPASS_ENV, password)], timeout)
                    .await
            }
            Credential::KeyFile(_) | Credential::Agent => {
                self.runner.run_with_timeout("ssh", &args, timeout).await
            }
        }
    }

    fn transport(&self, detail: impl Into<String>) -> ChannelError {
        ChannelError::Transport {
            target: self.target.to_string(),
            detail: detail.into(),
        }
    }

    /// Path of the control socket; exposed for diagnostics.
    pub fn control_path(&self) -> &Path {
        &self.control_path
    }
}

impl<R: CommandRunner> SecureChannel for SshChannel<R> {
    fn target(&self) -> &HostTarget {
        &self.target
    }

    async fn execute(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Severed {
                target: self.target.to_string(),
            });
        }
        let output = self
            .invoke(&self.command_args(command), timeout)
            .await
            .map_err(|e| {
                if e.downcast_ref::<ProcessTimeout>().is_some() {
                    ChannelError::Timeout {
                        target: self.target.to_string(),
                        timeout,
                    }
                } else {
                    ChannelError::Spawn(format!("{e:#}"))
                }
            })?;
        let Some(code) = output.status.code() else {
            return Err(self.transport("ssh client terminated by a signal"));
        };
        if code == SSH_TRANSPORT_STATUS {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(self.transport(if stderr.is_empty() {
                "ssh exited with status 255".to_string()
            } else {
                stderr
            }));
        }
        Ok(CommandResult::from_streams(output.stdout, output.stderr, code))
    }

    async fn close(&self) -> Result<(), ChannelError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if self.control_path.exists() {
            let mut args = self.session_args();
            args.extend([
                "-O".to_string(),
                "exit".to_string(),
                self.target.destination(),
            ]);
            match self.invoke(&args, self.settings.connect_timeout).await {
                Ok(out) if !out.status.success() => {
                    debug!(
                        host = %self.target,
                        stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                        "control master already gone"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(host = %self.target, error = %e, "failed to stop control master"),
            }
        }
        let dir = match self.socket_dir.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(dir) = dir {
            dir.close().map_err(|e| {
                ChannelError::Spawn(format!("removing control socket directory: {e}"))
            })?;
        }
        debug!(host = %self.target, "ssh channel closed");
        Ok(())
    }
}
