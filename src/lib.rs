//! Quill - a small blogging platform
//!
//! Authors publish posts, readers and guests leave comments that wait for
//! moderation, and e-mail notifications go out from a background worker pool
//! when a comment or post is published or a contact message arrives.

pub mod api;
pub mod config;
pub mod db;
pub mod jobs;
pub mod models;
pub mod services;
