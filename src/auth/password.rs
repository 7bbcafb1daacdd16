use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("hashing failed: {0}")]
    Hash(String),
    #[error("stored hash is malformed: {0}")]
    MalformedHash(String),
}

/// Salted argon2 hash in PHC string form; the only shape a password is stored in.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e.to_string())
        })
}

pub fn verify_password(plain: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PasswordError::MalformedHash(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
