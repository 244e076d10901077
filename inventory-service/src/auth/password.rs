//! Credentials stored in `users.password_hash` as Argon2id PHC strings.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as HashError, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::{AppError, AppResult};

pub fn hash(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing error: {e}")))
}

/// A wrong password is `Ok(false)`. A stored value that is not a PHC string
/// is an internal error.
pub fn verify(password: &str, stored: &str) -> AppResult<bool> {
    let unreadable = |e: HashError| AppError::Internal(format!("Stored password hash: {e}"));
    let phc = PasswordHash::new(stored).map_err(unreadable)?;

    match Argon2::default().verify_password(password.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(unreadable(e)),
    }
}
