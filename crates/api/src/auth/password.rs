//! Password hashing with bcrypt.
//!
//! Hashes embed their own salt and cost factor, so verification needs no
//! side data. Plaintext passwords are never logged, stored, or echoed back.

/// Internal hashing/verification failure. Treated as a 500-class error by
/// callers — never as "password matches".
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[source] bcrypt::BcryptError),
    #[error("password verification failed: {0}")]
    Verify(#[source] bcrypt::BcryptError),
}

/// Hashes a password with the given bcrypt cost factor.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(password, cost).map_err(PasswordError::Hash)
}

/// Verifies a password against a stored hash using bcrypt's constant-time
/// comparison.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash).map_err(PasswordError::Verify)
}
