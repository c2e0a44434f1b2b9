//! Admin moderation API endpoints (staff only)

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{BulkResponse, IdsRequest, PageQuery, PublishedRequest};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Comment, PagedResult, Post};

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments/pending", get(list_pending_comments))
        .route("/comments/{id}/published", put(set_comment_published))
        .route("/comments/publish", post(bulk_publish_comments))
        .route("/comments/unpublish", post(bulk_unpublish_comments))
        .route("/posts/publish", post(bulk_publish_posts))
        .route("/posts/unpublish", post(bulk_unpublish_posts))
        .route("/posts/{id}/published", put(set_post_published))
}

/// GET /api/v1/admin/comments/pending
async fn list_pending_comments(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Comment>>, ApiError> {
    Ok(Json(state.moderation.list_pending(query.params()).await?))
}

/// PUT /api/v1/admin/comments/{id}/published
async fn set_comment_published(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PublishedRequest>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(state.moderation.set_published(id, body.is_published).await?))
}

/// POST /api/v1/admin/comments/publish
async fn bulk_publish_comments(
    State(state): State<AppState>,
    Json(body): Json<IdsRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let count = state.moderation.bulk_publish(&body.ids).await?;
    Ok(Json(BulkResponse {
        count,
        message: format!(
            "{} Comments have been marked as published and notifications have been sent",
            count
        ),
    }))
}

/// POST /api/v1/admin/comments/unpublish
async fn bulk_unpublish_comments(
    State(state): State<AppState>,
    Json(body): Json<IdsRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let count = state.moderation.bulk_unpublish(&body.ids).await?;
    Ok(Json(BulkResponse {
        count,
        message: format!("{} Comments have been marked as unpublished", count),
    }))
}

/// POST /api/v1/admin/posts/publish
async fn bulk_publish_posts(
    State(state): State<AppState>,
    Json(body): Json<IdsRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let count = state.publication.bulk_publish_posts(&body.ids).await?;
    Ok(Json(BulkResponse {
        count,
        message: format!("{} Posts have been marked as published", count),
    }))
}

/// POST /api/v1/admin/posts/unpublish
async fn bulk_unpublish_posts(
    State(state): State<AppState>,
    Json(body): Json<IdsRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let count = state.publication.bulk_unpublish_posts(&body.ids).await?;
    Ok(Json(BulkResponse {
        count,
        message: format!("{} Posts have been marked as unpublished", count),
    }))
}

/// PUT /api/v1/admin/posts/{id}/published
async fn set_post_published(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PublishedRequest>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(
        state
            .publication
            .admin_set_published(id, body.is_published)
            .await?,
    ))
}
