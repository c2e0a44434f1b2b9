//! Job queue

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::runner::JobStats;
use crate::models::NotificationJob;

/// Worker side of a [`ChannelJobQueue`]
pub type JobReceiver = mpsc::UnboundedReceiver<NotificationJob>;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("job queue is closed")]
    Closed,
}

/// Intake for notification jobs. `enqueue` never waits for the job to run.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job: NotificationJob) -> Result<(), QueueError>;
}

/// In-process queue backed by an unbounded tokio channel
pub struct ChannelJobQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<NotificationJob>>>,
    stats: Arc<JobStats>,
}

impl ChannelJobQueue {
    /// Create the queue and the receiver to hand to [`JobRunner::start`](super::JobRunner::start)
    pub fn new(stats: Arc<JobStats>) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            tx: Mutex::new(Some(tx)),
            stats,
        };
        (queue, rx)
    }

    /// Stop accepting jobs. Workers finish what is already queued, then exit.
    pub fn close(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
    }
}

impl JobQueue for ChannelJobQueue {
    fn enqueue(&self, job: NotificationJob) -> Result<(), QueueError> {
        let guard = self.tx.lock().map_err(|_| QueueError::Closed)?;
        let tx = guard.as_ref().ok_or(QueueError::Closed)?;
        let kind = job.kind;
        tx.send(job).map_err(|_| QueueError::Closed)?;
        self.stats.record_enqueued();
        tracing::debug!(job_kind = %kind, "Job enqueued");
        Ok(())
    }
}

/// Enqueue `job`, logging instead of failing when the queue is closed.
///
/// The state change that produced the job is already committed, so a closed
/// queue only costs the notification.
pub fn enqueue_or_warn(queue: &dyn JobQueue, job: NotificationJob) {
    let kind = job.kind;
    if let Err(e) = queue.enqueue(job) {
        tracing::warn!(job_kind = %kind, error = %e, "Notification job dropped");
    }
}
