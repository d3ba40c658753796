//! Account registration endpoint.

use crate::auth::verify::{encode_public_key, parse_public_key};
use crate::error::AppError;
use crate::models::{RegisterAccountRequest, StoredAccount};
use crate::routes::validate_phone_number;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

/// POST /api/accounts — Register a phone number against a wallet public key
pub async fn register_account(
    State(state): State<AppState>,
    Json(req): Json<RegisterAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let phone_number = validate_phone_number(&req.phone_number)?;

    let key = parse_public_key(req.public_key.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid public key: {}", e)))?;

    let account = StoredAccount {
        phone_number,
        account_id: encode_public_key(&key),
        created_at: chrono::Utc::now(),
    };

    if !state.directory.register(account.clone()).await? {
        return Err(AppError::Conflict(
            "Phone number already registered".to_string(),
        ));
    }

    tracing::info!(action = "account_registered", account_id = %account.account_id, "Account registered");

    Ok((StatusCode::CREATED, Json(account)))
}
