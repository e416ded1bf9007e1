//! `zonekit keygen`: make sure the injected key pair exists.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::KeyProvisioner;

/// Run `zonekit keygen`.
///
/// Only the `keys` section of the config is used, so a config without a
/// control host is accepted.
///
/// # Errors
///
/// Returns an error if the config cannot be read or the key pair cannot be
/// generated.
pub async fn run(app: &AppContext) -> Result<()> {
    let cfg = app.config_store.load_unvalidated()?;
    let public_key = app
        .key_provisioner()
        .ensure_key_pair(&cfg.keys.private_key, &cfg.keys.public_key)
        .await?;
    app.output.success("Key pair ready.");
    app.output
        .kv("private", &cfg.keys.private_key.display().to_string());
    app.output
        .kv("public", &cfg.keys.public_key.display().to_string());
    if app.output.quiet {
        return Ok(());
    }
    println!("{public_key}");
    Ok(())
}
