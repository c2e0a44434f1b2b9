#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};

use quill::api::{build_router, AppState};
use quill::config::Config;
use quill::db::{self, DynDatabasePool};
use quill::jobs::testing::RecordingQueue;
use quill::jobs::JobStats;
use quill::models::{Author, CreateAuthorInput, CreatePostInput, Post};
use quill::services::Services;

pub const PASSWORD: &str = "password123";

/// A router over an in-memory database with a recording job queue
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub queue: Arc<RecordingQueue>,
    pub pool: DynDatabasePool,
}

pub async fn create_test_app() -> TestApp {
    let pool = db::create_test_pool().await.unwrap();
    db::migrations::run_migrations(&pool).await.unwrap();

    let config = Config::default();
    let queue = Arc::new(RecordingQueue::new());
    let services = Services::new(pool.clone(), &config, queue.clone());
    let state = AppState::new(pool.clone(), services, Arc::new(JobStats::new()));

    let app = build_router(state.clone(), &config.server.cors_origin);
    let server = TestServer::new(app).unwrap();

    TestApp {
        server,
        state,
        queue,
        pool,
    }
}

pub async fn create_author(app: &TestApp, username: &str, staff: bool) -> Author {
    let mut input = CreateAuthorInput::new(username, format!("{}@example.com", username), PASSWORD);
    if staff {
        input = input.staff();
    }
    app.state.authors.create_author(input).await.unwrap()
}

/// Log in over HTTP and return the session token
pub async fn login(app: &TestApp, username: &str) -> String {
    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "username_or_email": username, "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    body["token"].as_str().unwrap().to_string()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Create a post as `author` through the service layer
pub async fn create_post(app: &TestApp, author: &Author, title: &str, published: bool) -> Post {
    app.state
        .publication
        .create_post(
            &author.identity(),
            CreatePostInput::new(title, "Short", "Full text").published(published),
        )
        .await
        .unwrap()
}
