//! API route handlers.

pub mod account;
pub mod auth;

use crate::error::AppError;
use crate::middleware::security_headers;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Validate an E.164-style phone number: optional `+`, then 7-15 digits.
///
/// Returns the trimmed number, which is the directory key.
pub fn validate_phone_number(raw: &str) -> Result<String, AppError> {
    let phone = raw.trim();
    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if digits.len() < 7 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("Invalid phone number".to_string()));
    }
    Ok(phone.to_string())
}

/// GET /api/health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        // Auth endpoints
        .route("/api/auth/challenge", post(auth::request_challenge))
        .route("/api/auth/verify", post(auth::verify_challenge))
        // Account endpoints
        .route("/api/accounts", post(account::register_account))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    // CorsLayer::new() with no allowed origins rejects all CORS preflight requests.
    if origins.is_empty() {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// The full application: API routes plus body limit, CORS and security headers.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    api_router()
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_body_bytes,
        ))
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state)
}
