// Password hashing with Argon2id
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, Params, Version,
};
use crate::errors::{AppError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password using Argon2id with OWASP recommended parameters
///
/// Parameters (OWASP 2023):
/// - Memory: 19 MiB (19456 KiB)
/// - Iterations: 2
/// - Parallelism: 1
/// - Output length: 32 bytes
pub fn hash_password(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let params = Params::new(
        19456,   // m_cost (memory): 19 MiB
        2,       // t_cost (iterations)
        1,       // p_cost (parallelism)
        Some(32), // output length
    )
    .map_err(|e| AppError::Cryptographic(format!("Failed to create Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Cryptographic(format!("Failed to hash password: {}", e)))?
        .to_string();

    tracing::debug!("Password hashed successfully");

    Ok(password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{PasswordHash, PasswordVerifier};

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        // Hash should be a valid PHC string
        assert!(hash.starts_with("$argon2id$"));

        // Hash should be different each time (due to random salt)
        assert_ne!(hash, hash_password("test_password_123").unwrap());
    }

    #[test]
    fn test_hash_verifies_only_the_hashed_password() {
        let hash = hash_password("test_password_123").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();

        assert!(Argon2::default()
            .verify_password(b"test_password_123", &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"wrong_password", &parsed)
            .is_err());
    }

    #[test]
    fn test_short_password() {
        let result = hash_password("short");
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        assert!(matches!(hash_password(""), Err(AppError::BadRequest(_))));
    }
}
