//! Data models
//!
//! Database entities, typed input DTOs and the notification job shape.

mod author;
mod comment;
mod contact;
mod job;
mod pagination;
mod post;
mod session;

pub use author::{Author, CreateAuthorInput, Identity, NewAuthor};
pub use comment::{Comment, NewComment, SubmitCommentInput, AUTHOR_LABEL_MAX_LEN, GUEST_PREFIX};
pub use contact::{ContactInput, ContactMessage, CONTACT_FIELD_MAX_LEN};
pub use job::{JobKeys, JobKind, NotificationJob, COMMENT_ID, MESSAGE_ID, POST_ID};
pub use pagination::{ListParams, PagedResult, PER_PAGE};
pub use post::{
    CreatePostInput, Post, PostDetail, UpdatePostInput, SHORT_DESCRIPTION_MAX_LEN, TITLE_MAX_LEN,
};
pub use session::Session;
