//! Password hashing for stored credentials.
//!
//! New hashes are Argon2id PHC strings with a random per-password salt.
//! bcrypt hashes imported from the legacy JSON store still verify and are
//! replaced with Argon2 on the next successful login.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::AppError;

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Hash a plaintext password.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a plaintext password against a stored Argon2 or bcrypt hash.
///
/// Unreadable hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    if is_bcrypt(stored_hash) {
        return bcrypt::verify(password, stored_hash).unwrap_or_else(|e| {
            tracing::warn!("Stored bcrypt hash is unreadable: {}", e);
            false
        });
    }

    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Stored password hash is not a PHC string: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// True if the stored hash should be replaced with a fresh Argon2 hash.
pub fn needs_rehash(stored_hash: &str) -> bool {
    is_bcrypt(stored_hash)
}

fn is_bcrypt(stored_hash: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|p| stored_hash.starts_with(p))
}
