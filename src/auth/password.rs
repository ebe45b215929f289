// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing and verification using Argon2id.
//!
//! Hashing is CPU- and memory-bound, so it runs on the blocking pool behind a
//! semaphore. The semaphore caps how many hashes are in flight at once; extra
//! requests queue on `acquire` instead of starving the async workers.
//!
//! Hashes are stored in PHC string format (`$argon2id$v=19$m=...`), which
//! embeds the salt and parameters.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use tokio::sync::Semaphore;

use crate::models::{AuthMethod, NewIdentity};

/// Fixed salt for [`PasswordHasher::verify_dummy`]. Its output is discarded.
const DUMMY_SALT: &str = "aWFtLWR1bW15LXNhbHQ";

/// Password hashing errors.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("unsupported authentication method '{0}'")]
    UnsupportedMethod(AuthMethod),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("password hashing worker failed: {0}")]
    Worker(String),
}

impl PasswordError {
    /// Whether the caller supplied bad input (as opposed to a server fault).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, PasswordError::Empty | PasswordError::UnsupportedMethod(_))
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iterations.
    pub time_cost: u32,
    pub parallelism: u32,
    /// Output hash length in bytes.
    pub hash_length: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
            hash_length: 32,
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub const fn memory_cost(mut self, kib: u32) -> Self {
        self.memory_cost = kib;
        self
    }

    #[must_use]
    pub const fn time_cost(mut self, iterations: u32) -> Self {
        self.time_cost = iterations;
        self
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.hash_length as usize),
        )
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Number of concurrent hashes when not configured: one per available core.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Bounded Argon2id hasher. Clones share the same permit pool.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    policy: PasswordPolicy,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl PasswordHasher {
    /// Build a hasher allowing at most `concurrency` hashes at once (minimum 1).
    pub fn new(policy: PasswordPolicy, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            policy,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PasswordPolicy::default(), default_concurrency())
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Validate a credential draft and hash its password.
    pub async fn hash_identity(&self, identity: &NewIdentity) -> Result<String, PasswordError> {
        match identity.auth_method {
            AuthMethod::Password => self.hash(&identity.password).await,
            other => Err(PasswordError::UnsupportedMethod(other)),
        }
    }

    /// Hash a password with a fresh random salt.
    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::Empty);
        }

        let argon2 = self.policy.argon2()?;
        let password = password.to_owned();
        self.run(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| PasswordError::Hash(e.to_string()))
        })
        .await
    }

    /// Check `password` against each stored hash in turn. Comparison is
    /// constant-time per hash. An empty list never matches but still costs
    /// one verification.
    pub async fn verify_any(
        &self,
        password: &str,
        hashes: Vec<String>,
    ) -> Result<bool, PasswordError> {
        if password.is_empty() {
            return Ok(false);
        }
        if hashes.is_empty() {
            self.verify_dummy(password).await?;
            return Ok(false);
        }

        let password = password.to_owned();
        self.run(move || {
            for stored in &hashes {
                let parsed =
                    PasswordHash::new(stored).map_err(|e| PasswordError::Hash(e.to_string()))?;
                // Parameters come from the PHC string, so any Argon2 variant verifies.
                if Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
                {
                    return Ok(true);
                }
            }
            Ok(false)
        })
        .await
    }

    /// Spend one policy-cost Argon2id derivation on `password` under a
    /// permit. Used where no stored hash exists, so a missing user costs the
    /// same as a wrong password.
    pub async fn verify_dummy(&self, password: &str) -> Result<(), PasswordError> {
        if password.is_empty() {
            return Ok(());
        }

        let argon2 = self.policy.argon2()?;
        let password = password.to_owned();
        self.run(move || {
            let salt =
                SaltString::from_b64(DUMMY_SALT).map_err(|e| PasswordError::Hash(e.to_string()))?;
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|_| ())
                .map_err(|e| PasswordError::Hash(e.to_string()))
        })
        .await
    }

    async fn run<T, F>(&self, work: F) -> Result<T, PasswordError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PasswordError::Worker(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        })
        .await
        .map_err(|e| PasswordError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(PasswordPolicy::default().memory_cost(1024).time_cost(1), 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify() {
        let hasher = test_hasher();
        let hash = hasher.hash("hunter2").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2"));
        assert!(hasher.verify_any("hunter2", vec![hash.clone()]).await.unwrap());
        assert!(!hasher.verify_any("hunter3", vec![hash]).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_distinct_salts() {
        let hasher = test_hasher();
        let a = hasher.hash("hunter2").await.unwrap();
        let b = hasher.hash("hunter2").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn verify_any_matches_any_stored_hash() {
        let hasher = test_hasher();
        let first = hasher.hash("first").await.unwrap();
        let second = hasher.hash("second").await.unwrap();

        let hashes = vec![first, second];
        assert!(hasher.verify_any("second", hashes.clone()).await.unwrap());
        assert!(!hasher.verify_any("third", hashes).await.unwrap());
        assert!(!hasher.verify_any("first", Vec::new()).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_empty_password_and_unspecified_method() {
        let hasher = test_hasher();

        let err = hasher.hash("").await.unwrap_err();
        assert!(matches!(err, PasswordError::Empty));
        assert!(err.is_invalid_argument());

        let draft = NewIdentity {
            auth_method: AuthMethod::Unspecified,
            password: "hunter2".into(),
        };
        let err = hasher.hash_identity(&draft).await.unwrap_err();
        assert!(matches!(err, PasswordError::UnsupportedMethod(AuthMethod::Unspecified)));
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_an_error() {
        let hasher = test_hasher();
        let err = hasher
            .verify_any("hunter2", vec!["not-a-phc-string".into()])
            .await
            .unwrap_err();
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn concurrency_is_at_least_one() {
        assert_eq!(PasswordHasher::new(PasswordPolicy::default(), 0).concurrency(), 1);
        assert!(default_concurrency() >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn queued_hashes_all_complete_with_single_permit() {
        let hasher = PasswordHasher::new(PasswordPolicy::default().memory_cost(1024).time_cost(1), 1);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let hasher = hasher.clone();
                tokio::spawn(async move { hasher.hash(&format!("pw-{i}")).await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(hasher.permits.available_permits(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_flight_work_never_exceeds_concurrency() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let hasher = PasswordHasher::new(PasswordPolicy::default(), 2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let hasher = hasher.clone();
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    hasher
                        .run(move || {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            active.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency {peak}");
        assert_eq!(peak, 2);
    }

    #[tokio::test]
    async fn empty_hash_list_costs_a_verification() {
        let hasher = PasswordHasher::new(PasswordPolicy::default(), 2);
        let hash = hasher.hash("hunter2").await.unwrap();

        let started = std::time::Instant::now();
        assert!(!hasher.verify_any("wrong", vec![hash]).await.unwrap());
        let wrong = started.elapsed();

        let started = std::time::Instant::now();
        assert!(!hasher.verify_any("wrong", Vec::new()).await.unwrap());
        let missing = started.elapsed();

        assert!(missing * 5 >= wrong, "missing={missing:?} wrong={wrong:?}");
    }
}
