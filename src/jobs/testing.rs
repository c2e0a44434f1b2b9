//! Job testing utilities.
//!
//! `RecordingQueue` stands in for the channel queue so tests can count what a
//! service enqueued without running any workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::queue::{JobQueue, QueueError};
use crate::models::{JobKind, NotificationJob};

/// Queue that keeps every accepted job in memory
#[derive(Debug, Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<NotificationJob>>,
    closed: AtomicBool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject all further jobs with `QueueError::Closed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Everything enqueued so far, in order
    pub fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of recorded jobs of `kind`
    pub fn count(&self, kind: JobKind) -> usize {
        self.jobs().iter().filter(|job| job.kind == kind).count()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<NotificationJob> {
        self.jobs
            .lock()
            .map(|mut jobs| std::mem::take(&mut *jobs))
            .unwrap_or_default()
    }
}

impl JobQueue for RecordingQueue {
    fn enqueue(&self, job: NotificationJob) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.jobs.lock().map_err(|_| QueueError::Closed)?.push(job);
        Ok(())
    }
}
