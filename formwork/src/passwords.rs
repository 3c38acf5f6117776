//! Django-compatible PBKDF2 password hashes:
//! `pbkdf2_sha256$<iterations>$<salt>$<base64 digest>`.

use std::num::NonZeroU32;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

pub const DEFAULT_ITERATIONS: u32 = 390_000;

const ALGORITHM: &str = "pbkdf2_sha256";
const DIGEST_LEN: usize = 32;
const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("iteration count must be positive")]
    ZeroIterations,
    #[error("failed to generate salt")]
    Salt,
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Result<Self, PasswordError> {
        Ok(Self {
            iterations: NonZeroU32::new(iterations).ok_or(PasswordError::ZeroIterations)?,
            rng: SystemRandom::new(),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut raw_salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut raw_salt)
            .map_err(|_| PasswordError::Salt)?;
        let salt = STANDARD.encode(raw_salt);

        let mut digest = [0u8; DIGEST_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            salt.as_bytes(),
            password.as_bytes(),
            &mut digest,
        );
        Ok(format!(
            "{ALGORITHM}${}${salt}${}",
            self.iterations,
            STANDARD.encode(digest)
        ))
    }

    /// Constant-time check. Malformed or foreign hashes never verify.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let mut parts = encoded.splitn(4, '$');
        let (Some(ALGORITHM), Some(iterations), Some(salt), Some(digest)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
            return false;
        };
        let Ok(digest) = STANDARD.decode(digest) else {
            return false;
        };
        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt.as_bytes(),
            password.as_bytes(),
            &digest,
        )
        .is_ok()
    }

    /// [`PasswordHasher::hash`] off the async runtime.
    pub async fn hash_blocking(&self, password: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    pub async fn verify_blocking(&self, password: String, encoded: String) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &encoded)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_and_are_salted() {
        let hasher = PasswordHasher::new(1_000).unwrap();
        let first = hasher.hash("s3cret!").unwrap();
        let second = hasher.hash("s3cret!").unwrap();

        assert!(first.starts_with("pbkdf2_sha256$1000$"));
        assert_ne!(first, second);
        assert!(hasher.verify("s3cret!", &first));
        assert!(!hasher.verify("wrong", &first));
    }

    #[test]
    fn verifies_hashes_with_other_salts_and_rounds() {
        let hasher = PasswordHasher::new(1).unwrap();
        let mut digest = [0u8; DIGEST_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            NonZeroU32::new(1000).unwrap(),
            b"seasalt",
            b"password",
            &mut digest,
        );
        let encoded = format!("pbkdf2_sha256$1000$seasalt${}", STANDARD.encode(digest));
        assert!(hasher.verify("password", &encoded));
    }

    #[test]
    fn malformed_hashes_do_not_verify() {
        let hasher = PasswordHasher::new(1_000).unwrap();
        for encoded in [
            "",
            "plain",
            "md5$1$salt$abc",
            "pbkdf2_sha256$0$salt$abc",
            "pbkdf2_sha256$x$salt$abc",
            "pbkdf2_sha256$1000$salt$!!!",
        ] {
            assert!(!hasher.verify("password", encoded), "{encoded}");
        }
    }

    #[test]
    fn zero_iterations_are_refused() {
        assert!(matches!(PasswordHasher::new(0), Err(PasswordError::ZeroIterations)));
    }

    #[tokio::test]
    async fn blocking_helpers() {
        let hasher = PasswordHasher::new(1_000).unwrap();
        let encoded = hasher.hash_blocking("pw".into()).await.unwrap();
        assert!(hasher.verify_blocking("pw".into(), encoded).await.unwrap());
    }
}
