//! Challenge store backends.
//!
//! Redis key pattern:
//! - `challenge:{account_id}` — challenge record (JSON), kept for a grace period past `expires_at`

use super::{ChallengeStore, StoreError};
use crate::models::ChallengeRecord;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use redis::AsyncCommands;

/// How long Redis keeps a record after `expires_at` by default.
pub const DEFAULT_REDIS_EXPIRY_GRACE_SECS: i64 = 60;

/// Share of the capacity evicted in one scan once the store is full of live records.
const EVICTION_BATCH_DIVISOR: usize = 16;

fn challenge_key(account_id: &str) -> String {
    format!("challenge:{}", account_id)
}

/// In-process challenge store.
///
/// Bounded by `capacity`: inserting a new account into a full store first
/// purges expired records, then evicts the records closest to expiry. One
/// scan evicts a batch of `capacity / 16` (at least one), so a full store is
/// not rescanned on every insert.
pub struct MemoryChallengeStore {
    challenges: DashMap<String, ChallengeRecord>,
    capacity: usize,
}

impl MemoryChallengeStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            challenges: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.challenges.len();
        self.challenges.retain(|_, record| !record.is_expired(now));
        before.saturating_sub(self.challenges.len())
    }

    fn eviction_batch(&self) -> usize {
        (self.capacity / EVICTION_BATCH_DIVISOR).max(1)
    }

    fn make_room(&self, now: DateTime<Utc>) {
        self.purge_expired_at(now);

        while self.challenges.len() >= self.capacity {
            // Collect keys first: removing while holding an iterator ref deadlocks.
            let mut candidates: Vec<(DateTime<Utc>, String)> = self
                .challenges
                .iter()
                .map(|entry| (entry.value().expires_at, entry.key().clone()))
                .collect();
            if candidates.is_empty() {
                break;
            }

            let batch = self.eviction_batch().min(candidates.len());
            if batch < candidates.len() {
                candidates.select_nth_unstable(batch - 1);
            }

            for (_, account_id) in candidates.into_iter().take(batch) {
                self.challenges.remove(&account_id);
            }
            tracing::warn!(
                action = "challenges_evicted",
                evicted = batch,
                capacity = self.capacity,
                "Challenge store full, evicted challenges closest to expiry"
            );
        }
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put(&self, record: ChallengeRecord) -> Result<(), StoreError> {
        if !self.challenges.contains_key(&record.account_id)
            && self.challenges.len() >= self.capacity
        {
            self.make_room(record.issued_at);
        }
        self.challenges.insert(record.account_id.clone(), record);
        Ok(())
    }

    async fn get(&self, account_id: &str) -> Result<Option<ChallengeRecord>, StoreError> {
        Ok(self
            .challenges
            .get(account_id)
            .map(|entry| entry.value().clone()))
    }

    async fn remove_if_matches(
        &self,
        account_id: &str,
        challenge: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .challenges
            .remove_if(account_id, |_, record| record.challenge == challenge)
            .is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(self.purge_expired_at(now))
    }
}

/// Redis challenge store for multi-instance deployments.
///
/// Records are written with `SET EX` for the challenge lifetime plus `grace`.
/// Until the grace period runs out an expired record is still readable, so the
/// authenticator reports it as expired and removes it; after that Redis drops
/// it on its own.
#[derive(Clone)]
pub struct RedisChallengeStore {
    client: redis::Client,
    grace: TimeDelta,
}

impl RedisChallengeStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            grace: TimeDelta::seconds(DEFAULT_REDIS_EXPIRY_GRACE_SECS),
        }
    }

    pub fn with_grace(mut self, grace: TimeDelta) -> Self {
        self.grace = grace.max(TimeDelta::zero());
        self
    }

    /// Key TTL in whole seconds, rounded up.
    fn key_ttl_secs(&self, record: &ChallengeRecord) -> u64 {
        let ttl_ms = (record.expires_at - record.issued_at + self.grace)
            .num_milliseconds()
            .max(1);
        (ttl_ms as u64).div_ceil(1000)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn put(&self, record: ChallengeRecord) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        let key = challenge_key(&record.account_id);
        let json = serde_json::to_string(&record)?;

        con.set_ex::<_, _, ()>(&key, json, self.key_ttl_secs(&record))
            .await?;
        Ok(())
    }

    async fn get(&self, account_id: &str) -> Result<Option<ChallengeRecord>, StoreError> {
        let mut con = self.connection().await?;
        let json: Option<String> = con.get(challenge_key(account_id)).await?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn remove_if_matches(
        &self,
        account_id: &str,
        challenge: &str,
    ) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;

        // Lua script for atomic GET + compare + DEL
        let script = redis::Script::new(
            r"
            local val = redis.call('GET', KEYS[1])
            if not val then
                return 0
            end
            if cjson.decode(val)['challenge'] == ARGV[1] then
                redis.call('DEL', KEYS[1])
                return 1
            end
            return 0
            ",
        );

        let removed: i32 = script
            .key(challenge_key(account_id))
            .arg(challenge)
            .invoke_async(&mut con)
            .await?;

        Ok(removed == 1)
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        // Key TTLs already handle this, one grace period late.
        Ok(0)
    }
}
