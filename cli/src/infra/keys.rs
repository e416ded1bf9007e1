//! Infrastructure implementation of the `KeyProvisioner` port using `ssh-keygen`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::application::ports::{CommandRunner, KeyProvisioner};
use crate::domain::ssh::validate_public_key;

/// Generates the key pair injected into disposable zones.
///
/// Both files present means nothing is written and no process is spawned.
#[derive(Debug, Clone)]
pub struct SshKeygenProvisioner<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> SshKeygenProvisioner<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn keygen(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = self
            .runner
            .run("ssh-keygen", args)
            .await
            .context("running ssh-keygen")?;
        anyhow::ensure!(
            output.status.success(),
            "ssh-keygen failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(output.stdout)
    }

    async fn generate(&self, private_key: &Path, public_key: &Path) -> Result<()> {
        if let Some(parent) = private_key.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_private_dir(parent)?;
        }
        let private_str = private_key.to_string_lossy();
        self.keygen(&[
            "-q", "-t", "rsa", "-b", "2048", "-N", "", "-C", "zonekit", "-f", &private_str,
        ])
        .await?;

        let generated = private_key.with_extension(
            private_key
                .extension()
                .map_or_else(|| "pub".into(), |e| format!("{}.pub", e.to_string_lossy())),
        );
        if generated != public_key {
            if let Some(parent) = public_key.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
            std::fs::rename(&generated, public_key).with_context(|| {
                format!("moving {} to {}", generated.display(), public_key.display())
            })?;
        }
        info!(path = %private_key.display(), "generated key pair");
        Ok(())
    }

    async fn derive_public(&self, private_key: &Path, public_key: &Path) -> Result<()> {
        let private_str = private_key.to_string_lossy();
        let stdout = self.keygen(&["-y", "-f", &private_str]).await?;
        std::fs::write(public_key, stdout)
            .with_context(|| format!("writing {}", public_key.display()))?;
        info!(path = %public_key.display(), "regenerated public key");
        Ok(())
    }
}

impl<R: CommandRunner> KeyProvisioner for SshKeygenProvisioner<R> {
    async fn ensure_key_pair(&self, private_key: &Path, public_key: &Path) -> Result<String> {
        match (private_key.exists(), public_key.exists()) {
            (true, true) => {}
            (true, false) => self.derive_public(private_key, public_key).await?,
            (false, _) => {
                self.generate(private_key, public_key).await?;
            }
        }
        set_owner_only(private_key)?;

        let key = std::fs::read_to_string(public_key)
            .with_context(|| format!("reading {}", public_key.display()))?;
        let key = key.trim().to_string();
        validate_public_key(&key).with_context(|| format!("invalid {}", public_key.display()))?;
        Ok(key)
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("setting permissions on {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_owner_only(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .permissions()
        .mode();
    if mode & 0o077 != 0 {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path) -> Result<()> {
    Ok(())
}
