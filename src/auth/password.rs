/// Password Hashing and Verification
///
/// bcrypt with the crate's default work factor. Each hash carries its own
/// random salt, and comparison happens inside the scheme.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

/// Hash a password using bcrypt
///
/// # Errors
/// Fails only if bcrypt itself fails (resource exhaustion).
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its stored hash.
///
/// Never raises: a malformed or truncated digest simply verifies as false,
/// so callers always get a plain boolean.
pub fn verify_password(password: &str, hash: &str) -> bool {
    verify(password, hash).unwrap_or(false)
}
