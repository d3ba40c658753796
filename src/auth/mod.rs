//! Challenge-response authentication over Ed25519 wallet keys.

pub mod challenge;
pub mod clock;
pub mod nonce;
pub mod verify;

pub use challenge::{AuthError, ChallengeAuthenticator, ChallengeSettings};
pub use clock::{Clock, ManualClock, SystemClock};
pub use nonce::{compose_challenge, generate_challenge_nonce};
pub use verify::{parse_public_key, sign_challenge, verify_signature};
