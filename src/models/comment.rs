//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const AUTHOR_LABEL_MAX_LEN: usize = 200;
/// Prefix applied to labels supplied by anonymous commenters
pub const GUEST_PREFIX: &str = "Guest ";

/// Comment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    /// Free-text author label, not a reference to an account
    pub author: String,
    pub text: String,
    pub is_published: bool,
    /// Set once at creation
    pub published_date: DateTime<Utc>,
}

/// Row to insert
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author: String,
    pub text: String,
    pub is_published: bool,
}

/// Comment submission as received from a reader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitCommentInput {
    /// Ignored when the reader is logged in
    #[serde(default)]
    pub author: String,
    pub text: String,
}
