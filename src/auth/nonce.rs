//! Challenge nonce generation and challenge text composition.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use rand::Rng;

/// Number of random bytes behind every challenge.
pub const NONCE_BYTES: usize = 32;

/// Generate a cryptographically random challenge nonce.
///
/// Returns a URL-safe base64 string without padding (43 characters) from
/// 32 random bytes.
pub fn generate_challenge_nonce() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; NONCE_BYTES];
    rng.fill(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Compose the text a client must sign: `{prefix}:{nonce}:{issued_at_ms}`.
///
/// The whole string is what gets signed and compared. Nothing downstream
/// parses it back apart.
pub fn compose_challenge(prefix: &str, nonce: &str, issued_at: DateTime<Utc>) -> String {
    format!("{}:{}:{}", prefix, nonce, issued_at.timestamp_millis())
}
