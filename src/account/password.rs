//! Argon2id password hashing and verification.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use tracing::warn;

use crate::shared::AppError;

/// Hashes a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            warn!(error = %e, "Password hashing failed");
            AppError::Internal("Password hashing failed".to_string())
        })
}

/// Verifies a plaintext password against a stored hash.
///
/// Returns `Ok(false)` on mismatch; a malformed stored hash is an internal error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        warn!(error = %e, "Stored password hash is malformed");
        AppError::Internal("Password verification failed".to_string())
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => {
            warn!(error = %e, "Password verification failed");
            Err(AppError::Internal(
                "Password verification failed".to_string(),
            ))
        }
    }
}

/// Runs `hash_password` on the blocking pool
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            warn!(error = %e, "Password hashing task failed");
            AppError::Internal("Password hashing failed".to_string())
        })?
}

/// Runs `verify_password` on the blocking pool
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            warn!(error = %e, "Password verification task failed");
            AppError::Internal("Password verification failed".to_string())
        })?
}
