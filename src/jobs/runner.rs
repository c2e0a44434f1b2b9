//! Worker pool executing notification jobs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::queue::{ChannelJobQueue, JobReceiver};
use crate::models::{NotificationJob, COMMENT_ID, MESSAGE_ID, POST_ID};
use crate::services::DispatchError;

/// What a handler did with a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Mail handed to the transport
    Sent,
    /// Referenced state was gone or no longer justified sending
    Skipped,
}

/// Executes one job
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &NotificationJob) -> Result<JobOutcome, DispatchError>;
}

/// Job counters
#[derive(Debug, Default)]
pub struct JobStats {
    enqueued: AtomicU64,
    sent: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`JobStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatsSnapshot {
    pub enqueued: u64,
    pub sent: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl JobStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, outcome: Result<JobOutcome, ()>) {
        let counter = match outcome {
            Ok(JobOutcome::Sent) => &self.sent,
            Ok(JobOutcome::Skipped) => &self.skipped,
            Err(()) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> JobStatsSnapshot {
        JobStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Jobs enqueued but not yet finished
    pub fn in_flight(&self) -> u64 {
        let s = self.snapshot();
        s.enqueued.saturating_sub(s.sent + s.skipped + s.failed)
    }
}

/// Pool of workers sharing one job receiver
pub struct JobRunner {
    workers: Vec<JoinHandle<()>>,
    stats: Arc<JobStats>,
}

impl JobRunner {
    /// Spawn `workers` tasks (at least one) pulling from `rx`
    pub fn start(
        rx: JobReceiver,
        handler: Arc<dyn JobHandler>,
        workers: usize,
        stats: Arc<JobStats>,
    ) -> Self {
        let receiver = Arc::new(Mutex::new(rx));
        let count = workers.max(1);

        let workers = (0..count)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    receiver.clone(),
                    handler.clone(),
                    stats.clone(),
                ))
            })
            .collect();

        tracing::info!("Started {} notification worker(s)", count);
        Self { workers, stats }
    }

    pub fn stats(&self) -> &Arc<JobStats> {
        &self.stats
    }

    /// Close the queue and wait for the workers to drain it
    pub async fn shutdown(self, queue: &ChannelJobQueue) {
        queue.close();
        for handle in self.workers {
            if let Err(e) = handle.await {
                tracing::error!("Notification worker ended abnormally: {}", e);
            }
        }
        let s = self.stats.snapshot();
        tracing::info!(
            sent = s.sent,
            skipped = s.skipped,
            failed = s.failed,
            "Notification workers stopped"
        );
    }
}

async fn worker_loop(
    worker: usize,
    receiver: Arc<Mutex<JobReceiver>>,
    handler: Arc<dyn JobHandler>,
    stats: Arc<JobStats>,
) {
    loop {
        let job = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        let Some(job) = job else { break };

        let span = tracing::info_span!(
            "notification_job",
            worker,
            job_kind = %job.kind,
            post_id = job.key(POST_ID),
            comment_id = job.key(COMMENT_ID),
            message_id = job.key(MESSAGE_ID),
        );

        // Run in its own task so a panicking handler does not take the worker down
        let handler = handler.clone();
        let result = tokio::spawn(
            async move { handler.handle(&job).await }.instrument(span.clone()),
        )
        .await;

        span.in_scope(|| match result {
            Ok(Ok(outcome)) => {
                match outcome {
                    JobOutcome::Sent => tracing::info!("Notification sent"),
                    JobOutcome::Skipped => tracing::info!("Notification skipped"),
                }
                stats.record(Ok(outcome));
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Notification job failed");
                stats.record(Err(()));
            }
            Err(e) => {
                tracing::error!(error = %e, "Notification job panicked");
                stats.record(Err(()));
            }
        });
    }

    tracing::debug!(worker, "Notification worker exiting");
}
