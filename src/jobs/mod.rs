//! Background notification jobs
//!
//! Request handlers enqueue a [`NotificationJob`](crate::models::NotificationJob)
//! and return immediately. A pool of tokio workers owned by [`JobRunner`]
//! pulls jobs off the channel and hands each one to a [`JobHandler`].
//!
//! ```text
//! service ──enqueue──► ChannelJobQueue ──mpsc──► worker 0..N ──► JobHandler
//! ```
//!
//! There is no persistence, deduplication or retry. Jobs still in the channel
//! when the process exits are lost.

pub mod queue;
pub mod runner;
pub mod testing;

pub use queue::{enqueue_or_warn, ChannelJobQueue, JobQueue, JobReceiver, QueueError};
pub use runner::{JobHandler, JobOutcome, JobRunner, JobStats, JobStatsSnapshot};
