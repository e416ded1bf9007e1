//! SSH endpoint and credential types.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;

/// How a session authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    KeyFile(PathBuf),
    /// Whatever the local ssh agent or default identities provide.
    Agent,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            Credential::Agent => f.write_str("Agent"),
        }
    }
}

/// An (address, username, credential) triple a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub credential: Credential,
}

impl HostTarget {
    /// `user@address`, as passed to the ssh client.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.address)
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.address, self.port)
    }
}

/// Validates a single-line authorized-key entry (`ssh-rsa <base64> [comment]`).
///
/// # Errors
///
/// Returns an error if the key type is not `ssh-rsa` or `ssh-ed25519`, has no
/// key material, or spans more than one line.
pub fn validate_public_key(key: &str) -> Result<()> {
    let key = key.trim_end();
    anyhow::ensure!(!key.contains('\n'), "public key must be a single line");
    let material = key
        .strip_prefix("ssh-rsa ")
        .or_else(|| key.strip_prefix("ssh-ed25519 "))
        .ok_or_else(|| anyhow::anyhow!("unsupported public key format (got: {key:?})"))?;
    anyhow::ensure!(!material.trim().is_empty(), "public key has no key material");
    Ok(())
}

/// Salted SHA-256 crypt (`$5$`) hash of `password`, ready for the second
/// field of an `/etc/shadow` entry.
///
/// Both Solaris 10 and 11 accept algorithm `5` in `crypt(3C)`.
///
/// # Errors
///
/// Returns an error if no random salt can be drawn.
pub fn shadow_hash(password: &str) -> Result<String> {
    sha_crypt::sha256_simple(password, &sha_crypt::Sha256Params::default())
        .map_err(|e| anyhow::anyhow!("hashing zone password: {e:?}"))
}
