//! Notification job
//!
//! A job names an event and carries only the ids needed to re-read the
//! affected records when it runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Entity ids carried by a job, keyed by name
pub type JobKeys = BTreeMap<String, i64>;

pub const POST_ID: &str = "post_id";
pub const COMMENT_ID: &str = "comment_id";
pub const MESSAGE_ID: &str = "message_id";

/// Kind of notification event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    CommentPublished,
    PostPublished,
    ContactMessage,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::CommentPublished => "comment_published",
            JobKind::PostPublished => "post_published",
            JobKind::ContactMessage => "contact_message",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of deferred notification work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub kind: JobKind,
    pub keys: JobKeys,
}

impl NotificationJob {
    pub fn new(kind: JobKind, keys: JobKeys) -> Self {
        Self { kind, keys }
    }

    pub fn comment_published(post_id: i64, comment_id: i64) -> Self {
        let mut keys = JobKeys::new();
        keys.insert(POST_ID.to_string(), post_id);
        keys.insert(COMMENT_ID.to_string(), comment_id);
        Self::new(JobKind::CommentPublished, keys)
    }

    pub fn post_published(post_id: i64) -> Self {
        let mut keys = JobKeys::new();
        keys.insert(POST_ID.to_string(), post_id);
        Self::new(JobKind::PostPublished, keys)
    }

    pub fn contact_message(message_id: i64) -> Self {
        let mut keys = JobKeys::new();
        keys.insert(MESSAGE_ID.to_string(), message_id);
        Self::new(JobKind::ContactMessage, keys)
    }

    /// Look up one of the carried ids
    pub fn key(&self, name: &str) -> Option<i64> {
        self.keys.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_published_keys() {
        let job = NotificationJob::comment_published(3, 9);
        assert_eq!(job.kind, JobKind::CommentPublished);
        assert_eq!(job.key(POST_ID), Some(3));
        assert_eq!(job.key(COMMENT_ID), Some(9));
        assert_eq!(job.key(MESSAGE_ID), None);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let job = NotificationJob::post_published(1);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["kind"], "post_published");
        assert_eq!(json["keys"]["post_id"], 1);
        assert_eq!(JobKind::ContactMessage.to_string(), "contact_message");
    }
}
