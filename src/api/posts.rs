//! Post API endpoints
//!
//! - GET /api/v1/posts - published posts
//! - POST /api/v1/posts - create a post
//! - GET /api/v1/posts/unpublished - the caller's drafts
//! - GET /api/v1/posts/{id} - post detail with published comments
//! - PUT /api/v1/posts/{id} - edit a post (owner only)
//! - GET /api/v1/authors/{username}/posts - one author's published posts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{CreatePostInput, PagedResult, Post, PostDetail, UpdatePostInput};

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Post>>, ApiError> {
    Ok(Json(state.publication.list_published(query.params()).await?))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.publication.create_post(&identity, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_unpublished(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Post>>, ApiError> {
    Ok(Json(
        state
            .publication
            .list_unpublished_for_owner(&identity, query.params())
            .await?,
    ))
}

pub async fn get_post(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostDetail>, ApiError> {
    Ok(Json(
        state
            .publication
            .post_detail(id, viewer.as_ref(), query.params())
            .await?,
    ))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.publication.update_post(id, body, &identity).await?))
}

pub async fn list_author_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Post>>, ApiError> {
    Ok(Json(
        state
            .publication
            .list_by_author(&username, query.params())
            .await?,
    ))
}
