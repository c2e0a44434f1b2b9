//! Database repositories
//!
//! One repository per entity. Each pairs a trait with a `Sqlx*` implementation
//! that works on both SQLite and MySQL.

pub mod author;
pub mod comment;
pub mod contact;
pub mod post;
pub mod session;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
