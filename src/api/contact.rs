//! Contact form endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::api::middleware::{ApiError, AppState};
use crate::models::ContactInput;

/// POST /api/v1/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactInput>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.contact.submit(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": message.id, "success": true })),
    ))
}
