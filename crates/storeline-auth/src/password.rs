//! Password hashing and strength rules.
//!
//! Hashes are argon2id PHC strings (`$argon2id$v=19$m=...`), so the
//! parameters travel with each stored hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::AuthError;

/// Argon2id password hasher.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHasher {
    /// Create a hasher with custom cost parameters.
    ///
    /// `memory_kib` and `iterations` below the argon2 minimums are rejected.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AuthError::Internal(format!("invalid argon2 params: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {}", e)))
    }

    /// Verify a password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; a malformed hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("invalid password hash: {}", e)))?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Internal(format!(
                "password verification failed: {}",
                e
            ))),
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {}", e)))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("password verification task failed: {}", e)))?
    }
}

/// Minimum requirements for new passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Validate password strength.
    pub fn validate(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.min_length {
            return Err(AuthError::WeakPassword(format!(
                "password must be at least {} characters",
                self.min_length
            )));
        }
        if password.trim().is_empty() {
            return Err(AuthError::WeakPassword(
                "password must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(64, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("wrong horse", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_blocking_pool_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash_blocking("correct horse").await.unwrap();

        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(hasher.verify_blocking("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify_blocking("wrong horse", &hash).await.unwrap());
        assert!(matches!(
            hasher.verify_blocking("x", "not-a-hash").await,
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        let a = hasher.hash("same password").unwrap();
        let b = hasher.hash("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_uses_stored_params() {
        let hash = hasher().hash("portable").unwrap();
        // A hasher with other costs still verifies, the PHC string carries its own.
        let other = PasswordHasher::new(128, 2).unwrap();
        assert!(other.verify("portable", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert!(matches!(
            hasher().verify("x", "not-a-hash"),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn test_invalid_params() {
        assert!(PasswordHasher::new(1, 0).is_err());
    }

    #[test]
    fn test_password_policy() {
        let policy = PasswordPolicy::new(8);
        assert!(policy.validate("longenough").is_ok());
        assert!(matches!(
            policy.validate("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            policy.validate("        "),
            Err(AuthError::WeakPassword(_))
        ));
        // Length counts characters, not bytes.
        assert!(PasswordPolicy::new(4).validate("ééé").is_err());
    }
}
