//! Storage layer for outstanding challenges and the account directory.
//!
//! Each concern has an in-process backend (default, single instance) and a
//! Redis backend (shared between instances, native key TTL). Backends sit
//! behind object-safe traits so the rest of the crate holds an
//! `Arc<dyn ...>` and never knows which one it got.

pub mod account;
pub mod challenge;

use crate::models::{ChallengeRecord, StoredAccount};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use account::{MemoryAccountDirectory, RedisAccountDirectory};
pub use challenge::{MemoryChallengeStore, RedisChallengeStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keyed collection of outstanding challenges, one slot per account.
#[async_trait]
pub trait ChallengeStore: Send + Sync + 'static {
    /// Store a record, replacing any previous record for the same account.
    async fn put(&self, record: ChallengeRecord) -> Result<(), StoreError>;

    async fn get(&self, account_id: &str) -> Result<Option<ChallengeRecord>, StoreError>;

    /// Remove the account's record only if its challenge text is `challenge`.
    ///
    /// Returns `true` when this call removed it. Exactly one of several
    /// concurrent callers can observe `true` for the same record.
    async fn remove_if_matches(&self, account_id: &str, challenge: &str)
        -> Result<bool, StoreError>;

    /// Drop every record expired at `now`. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Resolves a phone number to the wallet account behind it.
#[async_trait]
pub trait AccountDirectory: Send + Sync + 'static {
    async fn lookup(&self, phone_number: &str) -> Result<Option<StoredAccount>, StoreError>;

    /// Register a new account. Returns `false` if the phone number is taken.
    async fn register(&self, account: StoredAccount) -> Result<bool, StoreError>;
}
