//! Auth API endpoints.

use crate::auth::AuthError;
use crate::error::AppError;
use crate::models::{ChallengeRequest, ChallengeResponse, VerifyRequest, VerifyResponse};
use crate::routes::validate_phone_number;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use base64::{engine::general_purpose, Engine as _};

/// POST /api/auth/challenge — Request a challenge to sign
pub async fn request_challenge(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let phone_number = validate_phone_number(&req.phone_number)?;

    let account = state
        .directory
        .lookup(&phone_number)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

    let record = state
        .authenticator
        .issue_challenge(&account.account_id)
        .await?;

    tracing::info!(action = "challenge_issued", account_id = %account.account_id, "Challenge issued");

    Ok(Json(ChallengeResponse {
        challenge: record.challenge,
        expires_at: record.expires_at,
    }))
}

/// POST /api/auth/verify — Verify a signed challenge
///
/// Every failure answers with the same 401 so callers cannot tell an unknown
/// account from an expired challenge or a bad signature.
pub async fn verify_challenge(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Ok(phone_number) = validate_phone_number(&req.phone_number) else {
        tracing::warn!(action = "auth_failed", reason = "invalid_phone_number", "Authentication failed");
        return Err(AppError::auth_failed());
    };

    let Some(account) = state.directory.lookup(&phone_number).await? else {
        tracing::warn!(action = "auth_failed", reason = "unknown_account", "Authentication failed");
        return Err(AppError::auth_failed());
    };

    // Undecodable base64 is treated as an empty, and therefore invalid, signature
    let signature = general_purpose::STANDARD
        .decode(req.signature.trim())
        .unwrap_or_default();

    let result = state
        .authenticator
        .verify_challenge(
            &account.account_id,
            &req.challenge,
            &signature,
            &account.account_id,
        )
        .await;

    match result {
        Ok(()) => {
            tracing::info!(action = "auth_success", account_id = %account.account_id, "Account authenticated");
            Ok(Json(VerifyResponse {
                authenticated: true,
                account_id: account.account_id,
                phone_number: account.phone_number,
            }))
        }
        Err(AuthError::Store(e)) => Err(e.into()),
        Err(e) => {
            tracing::warn!(
                action = "auth_failed",
                account_id = %account.account_id,
                reason = e.reason(),
                "Authentication failed"
            );
            Err(e.into())
        }
    }
}
