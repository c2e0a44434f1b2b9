//! Notification dispatcher
//!
//! Turns one [`NotificationJob`] into at most one e-mail. Every job re-reads
//! the records it names, so a job that runs after later edits sees current
//! state. When the state no longer justifies the mail (record deleted, comment
//! or post unpublished again) the job is skipped without sending.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;

use super::mail::{DeliveryError, MailTransport, OutgoingMail};
use crate::config::Config;
use crate::db::repositories::{
    AuthorRepository, CommentRepository, ContactRepository, PostRepository, SqlxAuthorRepository,
    SqlxCommentRepository, SqlxContactRepository, SqlxPostRepository,
};
use crate::db::DynDatabasePool;
use crate::jobs::{JobHandler, JobOutcome};
use crate::models::{
    Author, Comment, ContactMessage, JobKind, NotificationJob, Post, COMMENT_ID, MESSAGE_ID, POST_ID,
};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Addressing used by the templates
#[derive(Debug, Clone)]
pub struct MailAddressing {
    /// Sender of mail to post owners
    pub default_from: String,
    /// Sender of site-level notifications
    pub notifications_from: String,
    pub admin_recipients: Vec<String>,
    /// Prefix for post links, empty for relative links
    pub site_url: String,
}

impl MailAddressing {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_from: config.mail.default_from.clone(),
            notifications_from: config.notifications.notifications_from.clone(),
            admin_recipients: config.notifications.admin_recipients.clone(),
            site_url: config.notifications.site_url.clone(),
        }
    }

    pub fn post_url(&self, post_id: i64) -> String {
        format!("{}/post_detail/{}/", self.site_url.trim_end_matches('/'), post_id)
    }

    /// Mail to the post owner about a newly published comment
    pub fn comment_published(&self, post: &Post, owner: &Author, comment: &Comment) -> OutgoingMail {
        OutgoingMail {
            subject: format!("New comment on your post \"{}\"", post.title),
            body: format!(
                "Hi, {}! You have a new comment on your post \"{}\".\n\nAuthor: {}\nText: {}\nLink: {}#comment-{}",
                owner.username,
                post.title,
                comment.author,
                comment.text,
                self.post_url(post.id),
                comment.id
            ),
            from: self.default_from.clone(),
            to: vec![owner.email.clone()],
        }
    }

    /// Mail to the site admins about a newly published post
    pub fn post_published(&self, post: &Post) -> OutgoingMail {
        OutgoingMail {
            subject: "New post added".to_string(),
            body: format!("New post added: {}", self.post_url(post.id)),
            from: self.notifications_from.clone(),
            to: self.admin_recipients.clone(),
        }
    }

    /// Mail to the site admins carrying contact form feedback
    pub fn contact_message(&self, message: &ContactMessage) -> OutgoingMail {
        OutgoingMail {
            subject: format!("Feedback from {}", message.name),
            body: format!(
                "You have new feedback from {} ({})\n\n{}",
                message.name, message.email, message.message
            ),
            from: self.notifications_from.clone(),
            to: self.admin_recipients.clone(),
        }
    }
}

/// Job handler that formats and sends notification mail
pub struct NotificationDispatcher {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    authors: Arc<dyn AuthorRepository>,
    contacts: Arc<dyn ContactRepository>,
    transport: Arc<dyn MailTransport>,
    addressing: MailAddressing,
}

impl NotificationDispatcher {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        authors: Arc<dyn AuthorRepository>,
        contacts: Arc<dyn ContactRepository>,
        transport: Arc<dyn MailTransport>,
        addressing: MailAddressing,
    ) -> Self {
        Self {
            posts,
            comments,
            authors,
            contacts,
            transport,
            addressing,
        }
    }

    /// Dispatcher reading through the SQLx repositories on `pool`
    pub fn from_pool(pool: DynDatabasePool, transport: Arc<dyn MailTransport>, config: &Config) -> Self {
        Self::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxAuthorRepository::boxed(pool.clone()),
            SqlxContactRepository::boxed(pool),
            transport,
            MailAddressing::from_config(config),
        )
    }

    /// Handle one job
    pub async fn dispatch(&self, job: &NotificationJob) -> Result<JobOutcome, DispatchError> {
        let mail = match job.kind {
            JobKind::CommentPublished => {
                self.comment_published_mail(required_key(job, POST_ID)?, required_key(job, COMMENT_ID)?)
                    .await?
            }
            JobKind::PostPublished => self.post_published_mail(required_key(job, POST_ID)?).await?,
            JobKind::ContactMessage => {
                self.contact_message_mail(required_key(job, MESSAGE_ID)?).await?
            }
        };

        let Some(mail) = mail else {
            return Ok(JobOutcome::Skipped);
        };

        self.transport.send(&mail).await?;
        Ok(JobOutcome::Sent)
    }

    async fn comment_published_mail(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Option<OutgoingMail>, DispatchError> {
        let Some(post) = self.posts.get_by_id(post_id).await? else {
            return Ok(skip("post no longer exists"));
        };
        let Some(comment) = self.comments.get_by_id(comment_id).await? else {
            return Ok(skip("comment no longer exists"));
        };
        if comment.post_id != post.id {
            return Ok(skip("comment belongs to another post"));
        }
        if !comment.is_published {
            return Ok(skip("comment was unpublished before delivery"));
        }
        let Some(owner) = self.authors.get_by_id(post.owner_id).await? else {
            return Ok(skip("post owner no longer exists"));
        };

        Ok(Some(self.addressing.comment_published(&post, &owner, &comment)))
    }

    async fn post_published_mail(&self, post_id: i64) -> Result<Option<OutgoingMail>, DispatchError> {
        let Some(post) = self.posts.get_by_id(post_id).await? else {
            return Ok(skip("post no longer exists"));
        };
        if !post.is_published {
            return Ok(skip("post was unpublished before delivery"));
        }

        Ok(Some(self.addressing.post_published(&post)))
    }

    async fn contact_message_mail(&self, message_id: i64) -> Result<Option<OutgoingMail>, DispatchError> {
        let Some(message) = self.contacts.get_by_id(message_id).await? else {
            return Ok(skip("contact message no longer exists"));
        };

        Ok(Some(self.addressing.contact_message(&message)))
    }
}

#[async_trait]
impl JobHandler for NotificationDispatcher {
    async fn handle(&self, job: &NotificationJob) -> Result<JobOutcome, DispatchError> {
        self.dispatch(job).await
    }
}

fn required_key(job: &NotificationJob, name: &str) -> Result<i64, DispatchError> {
    job.key(name)
        .ok_or_else(|| DispatchError::Internal(anyhow!("{} job is missing {}", job.kind, name)))
}

fn skip(reason: &str) -> Option<OutgoingMail> {
    tracing::debug!(reason, "Skipping notification");
    None
}
