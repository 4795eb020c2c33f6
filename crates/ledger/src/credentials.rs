//! Username rules and password hashing.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use rand::rngs::OsRng;
use unicode_normalization::UnicodeNormalization;

use crate::{LedgerError, LedgerResult};

const USERNAME_BYTES: std::ops::RangeInclusive<usize> = 3..=25;
const PASSWORD_BYTES: std::ops::RangeInclusive<usize> = 8..=72;

/// Normalize a username (NFC) and check its length in bytes.
pub fn normalize_username(raw: &str) -> LedgerResult<String> {
    let username: String = raw.trim().nfc().collect();
    if username.is_empty() {
        return Err(LedgerError::InvalidInput(
            "username must be provided".to_string(),
        ));
    }
    if !USERNAME_BYTES.contains(&username.len()) {
        return Err(LedgerError::InvalidInput(format!(
            "username must be between {} and {} bytes long",
            USERNAME_BYTES.start(),
            USERNAME_BYTES.end()
        )));
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> LedgerResult<()> {
    if password.is_empty() {
        return Err(LedgerError::InvalidInput(
            "password must be provided".to_string(),
        ));
    }
    if !PASSWORD_BYTES.contains(&password.len()) {
        return Err(LedgerError::InvalidInput(format!(
            "password must be between {} and {} bytes long",
            PASSWORD_BYTES.start(),
            PASSWORD_BYTES.end()
        )));
    }
    Ok(())
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> LedgerResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| LedgerError::Credential(err.to_string()))
}

/// Check `password` against a stored PHC string.
pub fn verify_password(password: &str, stored: &str) -> LedgerResult<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|err| LedgerError::Credential(err.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(LedgerError::Credential(err.to_string())),
    }
}
