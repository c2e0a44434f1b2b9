//! Services layer - business logic
//!
//! - `CommentModeration`: comment submission and the publish state machine
//! - `PostPublication`: post create/edit, visibility rules and admin publishing
//! - `NotificationDispatcher`: turns notification jobs into e-mail
//! - `AuthorService` and `ContactService`
//!
//! Services are built once at startup and shared behind `Arc`; none of them
//! keeps global state.

pub mod author;
pub mod contact;
pub mod dispatcher;
pub mod error;
pub mod mail;
pub mod moderation;
pub mod paging;
pub mod password;
pub mod publication;
pub mod validation;

use std::sync::Arc;

pub use author::AuthorService;
pub use contact::ContactService;
pub use dispatcher::{DispatchError, MailAddressing, NotificationDispatcher};
pub use error::{CoreError, CoreResult};
pub use mail::{
    build_transport, DeliveryError, LogMailTransport, MailTransport, OutgoingMail,
    RecordingTransport, SmtpMailTransport,
};
pub use moderation::CommentModeration;
pub use password::{hash_password, verify_password};
pub use publication::PostPublication;

use crate::config::Config;
use crate::db::DynDatabasePool;
use crate::jobs::JobQueue;

/// The request-facing services, wired to one pool and one job queue
#[derive(Clone)]
pub struct Services {
    pub moderation: Arc<CommentModeration>,
    pub publication: Arc<PostPublication>,
    pub authors: Arc<AuthorService>,
    pub contact: Arc<ContactService>,
}

impl Services {
    pub fn new(pool: DynDatabasePool, config: &Config, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            moderation: Arc::new(CommentModeration::from_pool(pool.clone(), queue.clone())),
            publication: Arc::new(PostPublication::from_pool(pool.clone(), queue.clone())),
            authors: Arc::new(AuthorService::from_pool(
                pool.clone(),
                config.session.expiration_days,
            )),
            contact: Arc::new(ContactService::from_pool(pool, queue)),
        }
    }
}
