//! Quill - blog server with moderated comments and e-mail notifications

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill::{
    api::{self, AppState},
    config::Config,
    db,
    jobs::{ChannelJobQueue, JobRunner, JobStats},
    services::{build_transport, NotificationDispatcher, Services},
};

/// How often expired login sessions are purged
const SESSION_CLEANUP_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quill...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Notification pipeline: queue -> workers -> dispatcher -> mail transport
    let transport = build_transport(&config.mail)?;
    let dispatcher = Arc::new(NotificationDispatcher::from_pool(
        pool.clone(),
        transport,
        &config,
    ));
    let job_stats = Arc::new(JobStats::new());
    let (queue, rx) = ChannelJobQueue::new(job_stats.clone());
    let queue = Arc::new(queue);
    let runner = JobRunner::start(rx, dispatcher, config.jobs.workers, job_stats.clone());

    // Services are built once and shared by every request
    let services = Services::new(pool.clone(), &config, queue.clone());

    // Purge expired sessions periodically
    {
        let authors = services.authors.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(SESSION_CLEANUP_SECS));
            loop {
                interval.tick().await;
                if let Err(e) = authors.cleanup_expired_sessions().await {
                    tracing::warn!(error = %e, "Session cleanup failed");
                }
            }
        });
    }

    let state = AppState::new(pool.clone(), services, job_stats);

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, draining notification queue");
    runner.shutdown(&queue).await;
    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
