//! Password hashing

use crate::error::AppError;

/// Cost bounds accepted by bcrypt
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Prefixes of the bcrypt hash variants
const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Whether a stored password value is already a bcrypt hash
pub fn is_hashed(password: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|p| password.starts_with(p))
}

/// Turn a password into its stored form. Values that are already bcrypt
/// hashes are returned unchanged so a stored hash is never hashed twice.
pub fn hash_if_plaintext(password: &str, cost: u32) -> Result<String, AppError> {
    if is_hashed(password) {
        return Ok(password.to_string());
    }
    Ok(bcrypt::hash(password, cost)?)
}

/// Check a plaintext password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    Ok(bcrypt::verify(password, hash)?)
}
