//! Health check endpoint

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::AppState;
use crate::db::migrations;
use crate::jobs::JobStatsSnapshot;

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Serialize)]
pub struct JobsHealth {
    #[serde(flatten)]
    pub counters: JobStatsSnapshot,
    /// Enqueued but not yet finished
    pub in_flight: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: CheckStatus,
    pub migrations: CheckStatus,
    pub jobs: JobsHealth,
}

/// GET /api/v1/health
///
/// 200 when the database answers and the schema is current, 503 otherwise.
/// Job counters are reported either way.
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = match state.pool.ping().await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => CheckStatus::error(format!("Database error: {}", e)),
    };

    let migrations = if database.is_ok() {
        match migrations::pending_count(&state.pool).await {
            Ok(0) => CheckStatus::ok(),
            Ok(pending) => CheckStatus::error(format!("{} migration(s) pending", pending)),
            Err(e) => CheckStatus::error(format!("Migration check failed: {}", e)),
        }
    } else {
        CheckStatus::error("Database unavailable".to_string())
    };

    let healthy = database.is_ok() && migrations.is_ok();
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        migrations,
        jobs: JobsHealth {
            counters: state.job_stats.snapshot(),
            in_flight: state.job_stats.in_flight(),
        },
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
