//! Shared application state and backend selection.

use crate::auth::{ChallengeAuthenticator, Clock};
use crate::config::Config;
use crate::storage::{
    AccountDirectory, MemoryAccountDirectory, MemoryChallengeStore, RedisAccountDirectory,
    RedisChallengeStore,
};
use chrono::TimeDelta;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<ChallengeAuthenticator>,
    pub directory: Arc<dyn AccountDirectory>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        authenticator: Arc<ChallengeAuthenticator>,
        directory: Arc<dyn AccountDirectory>,
        config: Config,
    ) -> Self {
        Self {
            authenticator,
            directory,
            config: Arc::new(config),
        }
    }

    /// Single-instance state: challenges and accounts live in this process.
    pub fn in_memory(config: Config, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(MemoryChallengeStore::new(config.max_outstanding_challenges));
        let authenticator = Arc::new(ChallengeAuthenticator::new(
            store,
            clock,
            config.challenge_settings(),
        ));
        Self::new(
            authenticator,
            Arc::new(MemoryAccountDirectory::new()),
            config,
        )
    }

    /// Shared state in Redis, for running several instances behind one endpoint.
    pub fn with_redis(config: Config, client: redis::Client, clock: Arc<dyn Clock>) -> Self {
        let authenticator = Arc::new(ChallengeAuthenticator::new(
            Arc::new(
                RedisChallengeStore::new(client.clone()).with_grace(TimeDelta::seconds(
                    config.challenge_sweep_interval_secs as i64,
                )),
            ),
            clock,
            config.challenge_settings(),
        ));
        Self::new(
            authenticator,
            Arc::new(RedisAccountDirectory::new(client)),
            config,
        )
    }
}
