//! Password hashing and verification.
//!
//! Credentials are stored the way Dovecot's SQL passdb expects them when its
//! `default_pass_scheme` is SHA512-CRYPT: a `{SHA512-CRYPT}` prefix followed
//! by a salted `$6$` crypt string.

use pwhash::sha512_crypt;
use tracing::debug;

use super::{Error, PasswordHash};

/// Scheme name written in front of every stored hash.
pub const PASSWORD_SCHEME: &str = "SHA512-CRYPT";

/// Minimum accepted password length, in characters.
pub const PASSWORD_MIN_LEN: usize = 8;

/// Check a plaintext password against the creation policy.
///
/// # Errors
///
/// Returns [`Error::invalid_request`] when the password is too short or has
/// leading or trailing whitespace.
pub fn validate_password(password: &str) -> Result<(), Error> {
    if password.trim() != password {
        return Err(Error::invalid_request(
            "password must not begin or end with whitespace",
        ));
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(Error::invalid_request(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate and hash a plaintext password with a fresh salt.
///
/// # Errors
///
/// Returns the validation error from [`validate_password`], or an internal
/// error if the system random source fails.
pub fn hash_password(password: &str) -> Result<PasswordHash, Error> {
    validate_password(password)?;
    let hashed = sha512_crypt::hash(password)
        .map_err(|err| Error::internal(format!("failed to hash password: {err}")))?;
    Ok(PasswordHash::from_stored(format!("{{{PASSWORD_SCHEME}}}{hashed}")))
}

/// Compare a plaintext password with a stored credential.
///
/// Credentials without a scheme prefix are treated as bare SHA-512 crypt
/// strings. Any other scheme is rejected.
pub fn verify_password(password: &str, stored: &PasswordHash) -> bool {
    match stored.scheme() {
        None | Some(PASSWORD_SCHEME) => sha512_crypt::verify(password, stored.body()),
        Some(other) => {
            debug!(scheme = other, "unsupported password scheme");
            false
        }
    }
}
