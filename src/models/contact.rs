//! Contact form message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CONTACT_FIELD_MAX_LEN: usize = 100;

/// Feedback left through the contact form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Contact form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub message: String,
}
