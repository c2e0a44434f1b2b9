//! Contact form

use std::sync::Arc;

use super::error::{CoreError, CoreResult};
use super::validation::{is_valid_email, non_empty, required};
use crate::db::repositories::{ContactRepository, SqlxContactRepository};
use crate::db::DynDatabasePool;
use crate::jobs::{enqueue_or_warn, JobQueue};
use crate::models::{ContactInput, ContactMessage, NotificationJob, CONTACT_FIELD_MAX_LEN};

/// Stores contact form feedback and notifies the site admins
pub struct ContactService {
    contacts: Arc<dyn ContactRepository>,
    queue: Arc<dyn JobQueue>,
}

impl ContactService {
    pub fn new(contacts: Arc<dyn ContactRepository>, queue: Arc<dyn JobQueue>) -> Self {
        Self { contacts, queue }
    }

    pub fn from_pool(pool: DynDatabasePool, queue: Arc<dyn JobQueue>) -> Self {
        Self::new(SqlxContactRepository::boxed(pool), queue)
    }

    /// Validate and store a message, then enqueue one `contact_message` job
    pub async fn submit(&self, input: ContactInput) -> CoreResult<ContactMessage> {
        let name = required("Name", &input.name, CONTACT_FIELD_MAX_LEN)?;
        let email = required("Email", &input.email, CONTACT_FIELD_MAX_LEN)?;
        if !is_valid_email(&email) {
            return Err(CoreError::validation("Email address is invalid"));
        }
        let message = non_empty("Message", &input.message)?;

        let stored = self
            .contacts
            .create(&ContactInput {
                name,
                email,
                message,
            })
            .await?;

        tracing::info!(message_id = stored.id, "Contact message received");
        enqueue_or_warn(self.queue.as_ref(), NotificationJob::contact_message(stored.id));
        Ok(stored)
    }
}
