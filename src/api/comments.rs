//! Comment API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{Comment, PagedResult, SubmitCommentInput};

/// POST /api/v1/posts/{id}/comments
///
/// The comment is stored unpublished and waits for moderation.
pub async fn submit_comment(
    State(state): State<AppState>,
    MaybeUser(identity): MaybeUser,
    Path(post_id): Path<i64>,
    Json(body): Json<SubmitCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .moderation
        .submit(post_id, body, identity.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/v1/posts/{id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(post_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Comment>>, ApiError> {
    Ok(Json(
        state
            .moderation
            .list_for_post(post_id, viewer.as_ref(), query.params())
            .await?,
    ))
}
