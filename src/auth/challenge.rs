//! Challenge-response authenticator.
//!
//! Per account the lifecycle is:
//!
//! ```text
//!             issue_challenge
//!   (none) ─────────────────► PENDING { challenge, expires_at }
//!                               │ verify ok              → (none)
//!                               │ verify after expiry    → (none)
//!                               │ mismatch / bad sig     → PENDING (retry allowed)
//!                               │ issue_challenge again  → PENDING with new text
//! ```
//!
//! Every failure is reported to the caller as an [`AuthError`]; nothing is
//! retried internally.

use crate::auth::clock::Clock;
use crate::auth::nonce::{compose_challenge, generate_challenge_nonce};
use crate::auth::verify::{parse_public_key, verify_signature};
use crate::models::ChallengeRecord;
use crate::storage::{ChallengeStore, StoreError};
use chrono::TimeDelta;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 300;
pub const DEFAULT_CHALLENGE_PREFIX: &str = "itzs-auth";

#[derive(Debug, Clone)]
pub struct ChallengeSettings {
    pub ttl: TimeDelta,
    /// Namespace at the start of every challenge text.
    pub prefix: String,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            ttl: TimeDelta::seconds(DEFAULT_CHALLENGE_TTL_SECS),
            prefix: DEFAULT_CHALLENGE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Account id must not be empty")]
    InvalidAccountId,

    #[error("No active challenge")]
    NoActiveChallenge,

    #[error("Challenge expired")]
    ChallengeExpired,

    #[error("Challenge mismatch")]
    ChallengeMismatch,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Challenge store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Stable label for structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::InvalidAccountId => "invalid_account_id",
            AuthError::NoActiveChallenge => "no_active_challenge",
            AuthError::ChallengeExpired => "challenge_expired",
            AuthError::ChallengeMismatch => "challenge_mismatch",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Store(_) => "store_error",
        }
    }
}

/// Issues and verifies one-time, time-boxed challenges.
pub struct ChallengeAuthenticator {
    store: Arc<dyn ChallengeStore>,
    clock: Arc<dyn Clock>,
    settings: ChallengeSettings,
}

impl ChallengeAuthenticator {
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        clock: Arc<dyn Clock>,
        settings: ChallengeSettings,
    ) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ChallengeSettings {
        &self.settings
    }

    /// Issue a challenge for `account_id`, replacing any outstanding one.
    pub async fn issue_challenge(&self, account_id: &str) -> Result<ChallengeRecord, AuthError> {
        if account_id.trim().is_empty() {
            return Err(AuthError::InvalidAccountId);
        }

        let issued_at = self.clock.now();
        let nonce = generate_challenge_nonce();
        let record = ChallengeRecord {
            account_id: account_id.to_string(),
            challenge: compose_challenge(&self.settings.prefix, &nonce, issued_at),
            issued_at,
            expires_at: issued_at + self.settings.ttl,
        };

        self.store.put(record.clone()).await?;

        tracing::debug!(
            action = "challenge_issued",
            account_id = %account_id,
            expires_at = %record.expires_at,
            "Challenge issued"
        );

        Ok(record)
    }

    /// Verify `signature` over the outstanding challenge for `account_id`.
    ///
    /// `public_key` is the account's key as resolved by the caller (strkey
    /// or base64). The challenge is consumed on success and on detected
    /// expiry; a mismatch or bad signature leaves it in place.
    pub async fn verify_challenge(
        &self,
        account_id: &str,
        presented: &str,
        signature: &[u8],
        public_key: &str,
    ) -> Result<(), AuthError> {
        let record = self
            .store
            .get(account_id)
            .await?
            .ok_or(AuthError::NoActiveChallenge)?;

        if record.is_expired(self.clock.now()) {
            // Only drop this record: a re-issue may have raced in.
            self.store
                .remove_if_matches(account_id, &record.challenge)
                .await?;
            return Err(AuthError::ChallengeExpired);
        }

        let matches: bool = presented
            .as_bytes()
            .ct_eq(record.challenge.as_bytes())
            .into();
        if !matches {
            return Err(AuthError::ChallengeMismatch);
        }

        let key = parse_public_key(public_key).map_err(|_| AuthError::InvalidSignature)?;
        if !verify_signature(&key, record.challenge.as_bytes(), signature) {
            return Err(AuthError::InvalidSignature);
        }

        if self
            .store
            .remove_if_matches(account_id, &record.challenge)
            .await?
        {
            return Ok(());
        }

        // Lost the race: consumed by a concurrent verify, or replaced by a re-issue.
        match self.store.get(account_id).await? {
            Some(_) => Err(AuthError::ChallengeMismatch),
            None => Err(AuthError::NoActiveChallenge),
        }
    }

    /// Drop every expired challenge. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<usize, AuthError> {
        Ok(self.store.purge_expired(self.clock.now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::verify::{encode_public_key, generate_keypair};
    use crate::storage::MemoryChallengeStore;
    use chrono::Utc;
    use ed25519_dalek::{Signer, SigningKey};

    struct Harness {
        auth: Arc<ChallengeAuthenticator>,
        store: Arc<MemoryChallengeStore>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryChallengeStore::new(1_000));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let auth = Arc::new(ChallengeAuthenticator::new(
            store.clone(),
            clock.clone(),
            ChallengeSettings::default(),
        ));
        Harness { auth, store, clock }
    }

    fn sign(key: &SigningKey, text: &str) -> Vec<u8> {
        key.sign(text.as_bytes()).to_bytes().to_vec()
    }

    fn account(key: &SigningKey) -> String {
        encode_public_key(&key.verifying_key())
    }

    #[tokio::test]
    async fn test_issue_rejects_empty_account() {
        let h = harness();
        assert!(matches!(
            h.auth.issue_challenge("").await,
            Err(AuthError::InvalidAccountId)
        ));
        assert!(matches!(
            h.auth.issue_challenge("   ").await,
            Err(AuthError::InvalidAccountId)
        ));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_issue_sets_expiry_and_prefix() {
        let h = harness();
        let record = h.auth.issue_challenge("ACC1").await.unwrap();

        assert_eq!(record.account_id, "ACC1");
        assert_eq!(record.issued_at, h.clock.now());
        assert_eq!(record.expires_at, record.issued_at + TimeDelta::seconds(300));
        assert!(record.challenge.starts_with("itzs-auth:"));
        assert_eq!(h.store.get("ACC1").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_challenges_are_unique() {
        let h = harness();
        let first = h.auth.issue_challenge("ACC1").await.unwrap();
        let second = h.auth.issue_challenge("ACC2").await.unwrap();
        assert_ne!(first.challenge, second.challenge);
    }

    #[tokio::test]
    async fn test_verify_without_challenge() {
        let h = harness();
        let key = generate_keypair();
        let result = h
            .auth
            .verify_challenge(&account(&key), "anything", &sign(&key, "anything"), &account(&key))
            .await;
        assert!(matches!(result, Err(AuthError::NoActiveChallenge)));
    }

    #[tokio::test]
    async fn test_single_use() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);

        let record = h.auth.issue_challenge(&id).await.unwrap();
        let signature = sign(&key, &record.challenge);

        h.auth
            .verify_challenge(&id, &record.challenge, &signature, &id)
            .await
            .unwrap();
        assert!(h.store.get(&id).await.unwrap().is_none());

        let replay = h
            .auth
            .verify_challenge(&id, &record.challenge, &signature, &id)
            .await;
        assert!(matches!(replay, Err(AuthError::NoActiveChallenge)));
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);
        let epsilon = TimeDelta::milliseconds(1);

        // Just inside the TTL
        let record = h.auth.issue_challenge(&id).await.unwrap();
        h.clock.advance(TimeDelta::seconds(300) - epsilon);
        h.auth
            .verify_challenge(&id, &record.challenge, &sign(&key, &record.challenge), &id)
            .await
            .unwrap();

        // Just past the TTL
        let record = h.auth.issue_challenge(&id).await.unwrap();
        h.clock.advance(TimeDelta::seconds(300) + epsilon);
        let result = h
            .auth
            .verify_challenge(&id, &record.challenge, &sign(&key, &record.challenge), &id)
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeExpired)));

        // Expiry detection purges the record
        assert!(h.store.get(&id).await.unwrap().is_none());
        let result = h
            .auth
            .verify_challenge(&id, &record.challenge, &sign(&key, &record.challenge), &id)
            .await;
        assert!(matches!(result, Err(AuthError::NoActiveChallenge)));
    }

    #[tokio::test]
    async fn test_expired_check_precedes_mismatch() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);

        h.auth.issue_challenge(&id).await.unwrap();
        h.clock.advance(TimeDelta::seconds(301));

        let result = h
            .auth
            .verify_challenge(&id, "wrong text", &sign(&key, "wrong text"), &id)
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeExpired)));
    }

    #[tokio::test]
    async fn test_overwrite_on_reissue() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);

        let first = h.auth.issue_challenge(&id).await.unwrap();
        let second = h.auth.issue_challenge(&id).await.unwrap();

        let result = h
            .auth
            .verify_challenge(&id, &first.challenge, &sign(&key, &first.challenge), &id)
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeMismatch)));

        h.auth
            .verify_challenge(&id, &second.challenge, &sign(&key, &second.challenge), &id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mismatch_keeps_challenge() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);

        let record = h.auth.issue_challenge(&id).await.unwrap();
        let result = h
            .auth
            .verify_challenge(&id, "stale", &sign(&key, &record.challenge), &id)
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeMismatch)));

        h.auth
            .verify_challenge(&id, &record.challenge, &sign(&key, &record.challenge), &id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_signature_binding() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);
        let record = h.auth.issue_challenge(&id).await.unwrap();

        let variants = [
            record.challenge.to_uppercase(),
            format!(" {}", record.challenge),
            format!("{}\n", record.challenge),
            "some other text".to_string(),
        ];
        for text in &variants {
            let result = h
                .auth
                .verify_challenge(&id, &record.challenge, &sign(&key, text), &id)
                .await;
            assert!(
                matches!(result, Err(AuthError::InvalidSignature)),
                "signature over {:?} must not verify",
                text
            );
        }

        // Wrong key for the account
        let other = generate_keypair();
        let result = h
            .auth
            .verify_challenge(&id, &record.challenge, &sign(&other, &record.challenge), &id)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_malformed_key_and_signature() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);
        let record = h.auth.issue_challenge(&id).await.unwrap();

        let result = h
            .auth
            .verify_challenge(&id, &record.challenge, &sign(&key, &record.challenge), "GBAD")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));

        let result = h
            .auth
            .verify_challenge(&id, &record.challenge, b"short", &id)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));

        let result = h.auth.verify_challenge(&id, &record.challenge, &[], &id).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));

        assert!(h.store.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_idempotent_failure_reporting() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);
        let record = h.auth.issue_challenge(&id).await.unwrap();
        let bad = sign(&key, "not the challenge");

        for _ in 0..2 {
            let result = h
                .auth
                .verify_challenge(&id, &record.challenge, &bad, &id)
                .await;
            assert!(matches!(result, Err(AuthError::InvalidSignature)));
        }

        h.clock.advance(TimeDelta::seconds(299));
        h.auth
            .verify_challenge(&id, &record.challenge, &sign(&key, &record.challenge), &id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cross_account_isolation() {
        let h = harness();
        let key_a = generate_keypair();
        let key_b = generate_keypair();
        let id_a = account(&key_a);
        let id_b = account(&key_b);

        let record_b = h.auth.issue_challenge(&id_b).await.unwrap();
        let record_a = h.auth.issue_challenge(&id_a).await.unwrap();

        // A's signed challenge presented under B's account fails without touching B
        let result = h
            .auth
            .verify_challenge(&id_b, &record_a.challenge, &sign(&key_a, &record_a.challenge), &id_a)
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeMismatch)));

        h.auth
            .verify_challenge(&id_a, &record_a.challenge, &sign(&key_a, &record_a.challenge), &id_a)
            .await
            .unwrap();

        assert_eq!(h.store.get(&id_b).await.unwrap(), Some(record_b.clone()));
        h.auth
            .verify_challenge(&id_b, &record_b.challenge, &sign(&key_b, &record_b.challenge), &id_b)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_verifies_consume_once() {
        let h = harness();
        let key = generate_keypair();
        let id = account(&key);
        let record = h.auth.issue_challenge(&id).await.unwrap();
        let signature = sign(&key, &record.challenge);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let auth = h.auth.clone();
            let id = id.clone();
            let challenge = record.challenge.clone();
            let signature = signature.clone();
            handles.push(tokio::spawn(async move {
                auth.verify_challenge(&id, &challenge, &signature, &id).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(AuthError::NoActiveChallenge) => {}
                Err(other) => panic!("unexpected failure: {:?}", other),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let h = harness();
        let key = generate_keypair();
        let public_key = account(&key);

        let record = h.auth.issue_challenge("ACC1").await.unwrap();
        h.clock.advance(TimeDelta::seconds(10));
        h.auth
            .verify_challenge("ACC1", &record.challenge, &sign(&key, &record.challenge), &public_key)
            .await
            .unwrap();
        assert!(h.store.get("ACC1").await.unwrap().is_none());

        let record = h.auth.issue_challenge("ACC1").await.unwrap();
        h.clock.advance(TimeDelta::seconds(301));
        let result = h
            .auth
            .verify_challenge("ACC1", &record.challenge, &sign(&key, &record.challenge), &public_key)
            .await;
        assert!(matches!(result, Err(AuthError::ChallengeExpired)));
    }

    #[tokio::test]
    async fn test_purge_expired_uses_clock() {
        let h = harness();
        h.auth.issue_challenge("ACC1").await.unwrap();
        h.clock.advance(TimeDelta::seconds(200));
        h.auth.issue_challenge("ACC2").await.unwrap();

        h.clock.advance(TimeDelta::seconds(150));
        assert_eq!(h.auth.purge_expired().await.unwrap(), 1);
        assert!(h.store.get("ACC1").await.unwrap().is_none());
        assert!(h.store.get("ACC2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_custom_settings() {
        let store = Arc::new(MemoryChallengeStore::new(10));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let auth = ChallengeAuthenticator::new(
            store,
            clock,
            ChallengeSettings {
                ttl: TimeDelta::seconds(30),
                prefix: "nedapay".to_string(),
            },
        );

        let record = auth.issue_challenge("ACC1").await.unwrap();
        assert!(record.challenge.starts_with("nedapay:"));
        assert_eq!(record.expires_at - record.issued_at, TimeDelta::seconds(30));
        assert_eq!(auth.settings().prefix, "nedapay");
    }
}
