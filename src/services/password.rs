//! Password hashing, verification and the rehash check.
//!
//! Hashes are Argon2id PHC strings. Verification always uses the parameters
//! embedded in the stored hash; hashing uses the configured parameters, so a
//! hash produced under older settings verifies fine and is reported by
//! [`Passwords::needs_rehash`].

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;
use tracing::warn;

use crate::config::SecurityConfig;
use crate::constants::limits::TOKEN_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Passwords {
    memory_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Passwords {
    #[must_use]
    pub const fn new(config: &SecurityConfig) -> Self {
        Self {
            memory_cost_kib: config.argon2_memory_cost_kib,
            time_cost: config.argon2_time_cost,
            parallelism: config.argon2_parallelism,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_cost_kib, self.time_cost, self.parallelism, None)
            .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password with the configured parameters.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash. An unparsable hash never matches.
    #[must_use]
    pub fn verify(password: &str, password_hash: &str) -> bool {
        let parsed = match PasswordHash::new(password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Stored password hash is not a valid PHC string");
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Whether a stored hash was produced with another algorithm, version or
    /// cost parameters than the configured ones.
    #[must_use]
    pub fn needs_rehash(&self, password_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            return true;
        };

        if parsed.algorithm.as_str() != Algorithm::Argon2id.as_str() {
            return true;
        }

        if parsed.version != Some(Version::V0x13.into()) {
            return true;
        }

        let Ok(params) = Params::try_from(&parsed) else {
            return true;
        };

        params.m_cost() != self.memory_cost_kib
            || params.t_cost() != self.time_cost
            || params.p_cost() != self.parallelism
    }

    /// [`Passwords::hash`] on the blocking pool; Argon2 is CPU-bound.
    pub async fn hash_blocking(&self, password: &str) -> Result<String> {
        let passwords = *self;
        let password = password.to_string();

        task::spawn_blocking(move || passwords.hash(&password))
            .await
            .context("Password hashing task panicked")?
    }

    /// [`Passwords::verify`] on the blocking pool.
    pub async fn verify_blocking(password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();

        task::spawn_blocking(move || Self::verify(&password, &password_hash))
            .await
            .context("Password verification task panicked")
    }
}

/// Generate a random token (64 character hex string).
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_BYTES] = rng.random();

    bytes.iter().fold(String::with_capacity(TOKEN_BYTES * 2), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Passwords {
        Passwords::new(&SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        })
    }

    #[test]
    fn hash_and_verify_correct_password() {
        let hash = cheap().hash("secure-password-123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(Passwords::verify("secure-password-123", &hash));
        assert!(!Passwords::verify("wrong-password", &hash));
    }

    #[test]
    fn unparsable_hash_never_verifies() {
        assert!(!Passwords::verify("secret", "plain-text-secret"));
        assert!(!Passwords::verify("secret", ""));
    }

    #[test]
    fn fresh_hash_does_not_need_rehash() {
        let passwords = cheap();
        let hash = passwords.hash("secret").unwrap();
        assert!(!passwords.needs_rehash(&hash));
    }

    #[test]
    fn hash_with_other_params_needs_rehash() {
        let legacy = Passwords::new(&SecurityConfig {
            argon2_memory_cost_kib: 2048,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        });
        let hash = legacy.hash("secret").unwrap();

        assert!(cheap().needs_rehash(&hash));
        // Still verifies: params come from the hash itself.
        assert!(Passwords::verify("secret", &hash));
    }

    #[test]
    fn non_argon2id_hash_needs_rehash() {
        let salt = SaltString::generate(&mut OsRng);
        let argon2i = Argon2::new(
            Algorithm::Argon2i,
            Version::V0x13,
            Params::new(1024, 1, 1, None).unwrap(),
        );
        let hash = argon2i
            .hash_password(b"secret", &salt)
            .unwrap()
            .to_string();

        assert!(cheap().needs_rehash(&hash));
        assert!(cheap().needs_rehash("not-a-phc-string"));
    }

    #[test]
    fn generated_tokens_are_hex_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn blocking_helpers_agree_with_sync_versions() {
        let passwords = cheap();
        let hash = passwords.hash_blocking("secret").await.unwrap();
        assert!(Passwords::verify_blocking("secret", &hash).await.unwrap());
        assert!(!Passwords::verify_blocking("nope", &hash).await.unwrap());
    }
}
