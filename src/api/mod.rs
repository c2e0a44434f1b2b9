//! API layer - HTTP handlers and routing
//!
//! A thin HTTP front over the services:
//! - Auth endpoints (login, logout, current identity)
//! - Post endpoints (listings, detail, create, edit)
//! - Comment submission
//! - Contact form
//! - Staff moderation endpoints
//! - Health check

pub mod admin;
pub mod auth;
pub mod comments;
pub mod common;
pub mod contact;
pub mod health;
pub mod middleware;
pub mod posts;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Build the API router (mounted under `/api/v1`)
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Staff routes
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes that need a session
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route("/posts", post(posts::create_post))
        .route("/posts/unpublished", get(posts::list_unpublished))
        .route("/posts/{id}", axum::routing::put(posts::update_post))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; a valid session is picked up when present
    let public_routes = Router::new()
        .nest("/auth", auth::public_router())
        .route("/posts", get(posts::list_posts))
        .route("/posts/{id}", get(posts::get_post))
        .route(
            "/posts/{id}/comments",
            get(comments::list_comments).post(comments::submit_comment),
        )
        .route("/authors/{username}/posts", get(posts::list_author_posts))
        .route("/contact", post(contact::submit_contact))
        .route("/health", get(health::health_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ));

    public_routes.merge(protected_routes).merge(admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let origin = HeaderValue::from_str(cors_origin).unwrap_or_else(|_| {
        tracing::warn!("Invalid CORS origin '{}', falling back to localhost", cors_origin);
        HeaderValue::from_static("http://localhost:3000")
    });

    // Credentials allowed so the session cookie works cross-origin
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
