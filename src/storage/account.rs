//! Account directory backends.
//!
//! Redis key pattern:
//! - `account:{phone_number}` — account data (JSON), no TTL

use super::{AccountDirectory, StoreError};
use crate::models::StoredAccount;
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use redis::AsyncCommands;

fn account_key(phone_number: &str) -> String {
    format!("account:{}", phone_number)
}

/// In-process account directory.
#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: DashMap<String, StoredAccount>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn lookup(&self, phone_number: &str) -> Result<Option<StoredAccount>, StoreError> {
        Ok(self
            .accounts
            .get(phone_number)
            .map(|entry| entry.value().clone()))
    }

    async fn register(&self, account: StoredAccount) -> Result<bool, StoreError> {
        match self.accounts.entry(account.phone_number.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(account);
                Ok(true)
            }
        }
    }
}

/// Redis account directory.
#[derive(Clone)]
pub struct RedisAccountDirectory {
    client: redis::Client,
}

impl RedisAccountDirectory {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AccountDirectory for RedisAccountDirectory {
    async fn lookup(&self, phone_number: &str) -> Result<Option<StoredAccount>, StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let json: Option<String> = con.get(account_key(phone_number)).await?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn register(&self, account: StoredAccount) -> Result<bool, StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(&account)?;

        // SETNX keeps registration first-writer-wins across instances
        let created: bool = con.set_nx(account_key(&account.phone_number), json).await?;
        Ok(created)
    }
}
