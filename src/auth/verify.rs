//! Ed25519 key handling and signature verification.
//!
//! Wallet keys travel as Stellar strkeys (`G...` public, `S...` secret seed).
//! Public keys are also accepted as plain base64 of the 32 key bytes.

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use stellar_strkey::ed25519::{PrivateKey, PublicKey};
use zeroize::{Zeroize, Zeroizing};

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid strkey")]
    InvalidStrkey,

    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid public key: {0}")]
    InvalidKey(String),
}

/// Parse a public key from a `G...` strkey or base64 of the raw 32 bytes.
pub fn parse_public_key(encoded: &str) -> Result<VerifyingKey, KeyError> {
    let bytes: [u8; 32] = if encoded.starts_with('G') && encoded.len() == 56 {
        PublicKey::from_string(encoded)
            .map_err(|_| KeyError::InvalidStrkey)?
            .0
    } else {
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| KeyError::InvalidBase64(e.to_string()))?;
        let len = decoded.len();
        decoded
            .try_into()
            .map_err(|_| KeyError::InvalidLength(len))?
    };

    VerifyingKey::from_bytes(&bytes).map_err(|e| KeyError::InvalidKey(e.to_string()))
}

/// Encode a public key as a Stellar `G...` strkey.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    PublicKey(key.to_bytes()).to_string()
}

/// Verify an Ed25519 signature over `message`.
///
/// Malformed signature bytes count as an invalid signature.
pub fn verify_signature(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };

    // Constant-time comparison is built into ed25519-dalek
    key.verify(message, &signature).is_ok()
}

/// Generate a fresh wallet keypair.
pub fn generate_keypair() -> SigningKey {
    let mut seed = [0u8; 32];
    rand::fill(&mut seed);
    let signing_key = SigningKey::from_bytes(&seed);
    seed.zeroize();
    signing_key
}

/// Encode a signing key as a Stellar `S...` secret seed.
pub fn encode_secret_seed(key: &SigningKey) -> Zeroizing<String> {
    Zeroizing::new(PrivateKey(key.to_bytes()).to_string())
}

/// Parse a signing key from a Stellar `S...` secret seed.
pub fn parse_secret_seed(encoded: &str) -> Result<SigningKey, KeyError> {
    let mut seed = PrivateKey::from_string(encoded)
        .map_err(|_| KeyError::InvalidStrkey)?
        .0;
    let signing_key = SigningKey::from_bytes(&seed);
    seed.zeroize();
    Ok(signing_key)
}

/// Sign challenge text the way a wallet client does: Ed25519 over the exact
/// UTF-8 bytes, returned as standard base64.
pub fn sign_challenge(key: &SigningKey, challenge: &str) -> String {
    let signature = key.sign(challenge.as_bytes());
    general_purpose::STANDARD.encode(signature.to_bytes())
}
