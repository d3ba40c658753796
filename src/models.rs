//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent what the challenge and account stores hold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Models
// ============================================================================

/// Request for an authentication challenge.
#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    pub phone_number: String,
}

/// Response containing the challenge text to sign.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
    pub expires_at: DateTime<Utc>,
}

/// Request to verify a signed challenge.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub phone_number: String,
    pub challenge: String,
    pub signature: String, // base64
}

/// Response after successful verification.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
    pub account_id: String,
    pub phone_number: String,
}

// ============================================================================
// Account Models
// ============================================================================

/// Request to register a phone number against a wallet public key.
#[derive(Debug, Deserialize)]
pub struct RegisterAccountRequest {
    pub phone_number: String,
    /// Stellar strkey (`G...`) or base64 Ed25519 public key.
    pub public_key: String,
}

// ============================================================================
// Storage Models
// ============================================================================

/// An outstanding challenge for one account.
///
/// Immutable once issued: it is replaced by a re-issue or removed on
/// success/expiry, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub account_id: String,
    pub challenge: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeRecord {
    /// A record is still valid at exactly `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Account data as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    pub phone_number: String,
    /// Stellar strkey public key, also used as the challenge key.
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}
