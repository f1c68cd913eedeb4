//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings; the raw password never touches the
//! database or logs.

use anyhow::{anyhow, Result};
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

fn argon2() -> Result<Argon2<'static>> {
    let params = Params::new(
        32_768, // 32 MB
        3,      // iterations
        1,      // parallelism
        None,
    )
    .map_err(|e| anyhow!("Failed to create Argon2 params: {e}"))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with a fresh random salt.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {e}"))?
        .to_string();

    Ok(hash)
}

/// Verify a password against a stored PHC string.
///
/// # Errors
/// Returns an error if the stored hash is malformed or verification itself
/// fails; a wrong password is `Ok(false)`, not an error.
pub fn verify_password(password: &str, phc: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(phc).map_err(|e| anyhow!("Invalid password hash format: {e}"))?;

    match argon2()?.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("Password verification failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() -> Result<()> {
        let hash = hash_password("S3cret!pass")?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("S3cret!pass", &hash)?);
        assert!(!verify_password("wrong", &hash)?);
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash_password("same-password")?;
        let second = hash_password("same-password")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
