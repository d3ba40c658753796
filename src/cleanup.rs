//! Background sweep of expired challenges.
//!
//! Expired challenges are already rejected and dropped lazily on the next
//! verify. This job only keeps the in-process store from holding records
//! for accounts that never came back.

use crate::auth::ChallengeAuthenticator;
use std::sync::Arc;
use std::time::Duration;

/// Run the sweep loop.
///
/// Purges expired challenges every `interval`. Never returns.
pub async fn run_sweep_loop(authenticator: Arc<ChallengeAuthenticator>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        sweep_once(&authenticator).await;
    }
}

/// One sweep pass. Failures are logged and the next pass tries again.
pub async fn sweep_once(authenticator: &ChallengeAuthenticator) -> usize {
    match authenticator.purge_expired().await {
        Ok(purged) => {
            if purged > 0 {
                tracing::info!(purged = purged, "Challenge sweep completed");
            }
            purged
        }
        Err(e) => {
            tracing::error!(error = %e, "Challenge sweep failed");
            0
        }
    }
}
