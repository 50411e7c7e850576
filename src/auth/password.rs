use std::fmt;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    /// Hash compared against when a login names no known user.
    static ref DUMMY_HASH: Option<CredentialHash> =
        hash_password("no-such-user-placeholder").ok();
}

/// Argon2 PHC string derived from a password. Not serializable; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Wraps a hash read back from the store.
    pub fn from_stored(phc: String) -> Self {
        Self(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash(<redacted>)")
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<CredentialHash> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(CredentialHash(hash))
}

pub fn verify_password(plain: &str, hash: &CredentialHash) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash.as_str()).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs a full argon2 verification for an unknown account so that login
/// takes the same time whether or not the email exists. Always fails.
pub fn verify_unknown_user(plain: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_ref() {
        let _ = verify_password(plain, hash);
    }
    false
}
