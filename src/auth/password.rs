use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::AppError;

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored hash.
///
/// Accepts Argon2 PHC strings and the unsalted SHA-256 hex digests that
/// older spreadsheet rows were written with. Unreadable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if stored.starts_with('$') {
        return match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable password hash");
                false
            }
        };
    }

    if stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit()) {
        let digest = hex::encode(Sha256::digest(password.as_bytes()));
        return digest.as_bytes().ct_eq(stored.to_ascii_lowercase().as_bytes()).into();
    }

    false
}
