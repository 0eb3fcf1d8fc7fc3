use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};

use crate::error::ApiError;

/// Hashes a password with Argon2id and a fresh random salt, producing a PHC
/// string suitable for storage. Two calls with the same input yield different
/// hashes. CPU-bound by design; no I/O.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Verifies a password against a stored PHC hash. A malformed stored hash is
/// treated as a mismatch, never as an error: the caller only ever learns
/// "does not verify".
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
