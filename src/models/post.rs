//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Comment, PagedResult};

pub const TITLE_MAX_LEN: usize = 200;
pub const SHORT_DESCRIPTION_MAX_LEN: usize = 255;

/// A publishable article owned by one author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// Owning author
    pub owner_id: i64,
    pub title: String,
    pub short_description: String,
    pub full_description: String,
    /// Reference to an uploaded image
    pub image: Option<String>,
    pub is_published: bool,
    /// Set once at creation
    pub published_date: DateTime<Utc>,
}

/// Input for creating a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub short_description: String,
    pub full_description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl CreatePostInput {
    pub fn new(
        title: impl Into<String>,
        short_description: impl Into<String>,
        full_description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            short_description: short_description.into(),
            full_description: full_description.into(),
            image: None,
            is_published: false,
        }
    }

    pub fn published(mut self, is_published: bool) -> Self {
        self.is_published = is_published;
        self
    }
}

/// Input for updating a post; absent fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub image: Option<Option<String>>,
    pub is_published: Option<bool>,
}

impl UpdatePostInput {
    /// Apply the present fields to `post`
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(short_description) = &self.short_description {
            post.short_description = short_description.clone();
        }
        if let Some(full_description) = &self.full_description {
            post.full_description = full_description.clone();
        }
        if let Some(image) = &self.image {
            post.image = image.clone();
        }
    }
}

/// A post with the comments a viewer may see
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    /// Published comments only, newest first
    pub comments: PagedResult<Comment>,
    /// The viewer owns the post
    pub is_owner: bool,
}
