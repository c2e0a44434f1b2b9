//! Authentication API endpoints
//!
//! - POST /api/v1/auth/login - open a session
//! - POST /api/v1/auth/logout - end the current session
//! - GET /api/v1/auth/me - current identity

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::models::Identity;

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: Identity,
    pub token: String,
}

/// Routes open to everyone
pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Routes that need a session (wrapped in `require_auth`)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age_secs
    ))
    .map_err(|_| ApiError::internal_error("Invalid session cookie"))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .authors
        .login(&body.username_or_email, &body.password)
        .await?;

    let user = state
        .authors
        .current_identity(&session.id)
        .await?
        .ok_or_else(|| ApiError::internal_error("Session validation failed"))?;

    let max_age = (session.expires_at - session.created_at).num_seconds();
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&session.id, max_age)?);

    Ok((
        headers,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&request_headers) {
        state.authors.logout(&token).await?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie("", 0)?);
    Ok((headers, Json(serde_json::json!({ "success": true }))))
}

/// GET /api/v1/auth/me
async fn me(Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>) -> Json<Identity> {
    Json(identity)
}
