//! Post repository
//!
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! `is_published` is never written by `update`; it changes only through
//! `compare_and_set_published`, whose affected-row count tells the caller
//! whether the flag actually flipped.

use crate::config::DatabaseDriver;
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{CreatePostInput, ListParams, Post};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const POST_COLUMNS: &str =
    "id, owner_id, title, short_description, full_description, image, is_published, published_date";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post owned by `owner_id`
    async fn create(&self, owner_id: i64, input: &CreatePostInput) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Save the editable fields (title, descriptions, image)
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Set `is_published` to `new` only if it currently equals `expected`.
    /// Returns whether the row changed.
    async fn compare_and_set_published(&self, id: i64, expected: bool, new: bool) -> Result<bool>;

    /// Published posts, newest first
    async fn list_published(&self, params: ListParams) -> Result<(Vec<Post>, i64)>;

    /// One owner's posts with the given publication state, newest first
    async fn list_by_owner(
        &self,
        owner_id: i64,
        is_published: bool,
        params: ListParams,
    ) -> Result<(Vec<Post>, i64)>;

    /// Delete a post and, by cascade, its comments
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Row filter for listings
#[derive(Debug, Clone, Copy)]
struct PostFilter {
    owner_id: Option<i64>,
    is_published: bool,
}

impl PostFilter {
    fn where_clause(&self) -> &'static str {
        if self.owner_id.is_some() {
            "WHERE is_published = ? AND owner_id = ?"
        } else {
            "WHERE is_published = ?"
        }
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, owner_id: i64, input: &CreatePostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(sqlite_pool(&self.pool)?, owner_id, input).await,
            DatabaseDriver::Mysql => create_post_mysql(mysql_pool(&self.pool)?, owner_id, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(sqlite_pool(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(mysql_pool(&self.pool)?, id).await,
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        let sql = "UPDATE posts SET title = ?, short_description = ?, full_description = ?, image = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&post.title)
                .bind(&post.short_description)
                .bind(&post.full_description)
                .bind(&post.image)
                .bind(post.id)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&post.title)
                .bind(&post.short_description)
                .bind(&post.full_description)
                .bind(&post.image)
                .bind(post.id)
                .execute(mysql_pool(&self.pool)?)
                .await
                .map(|_| ()),
        }
        .context("Failed to update post")?;

        // MySQL reports zero affected rows for an unchanged row, so read back
        self.get_by_id(post.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post {} not found after update", post.id))
    }

    async fn compare_and_set_published(&self, id: i64, expected: bool, new: bool) -> Result<bool> {
        let sql = "UPDATE posts SET is_published = ? WHERE id = ? AND is_published = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(new)
                .bind(id)
                .bind(expected)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(new)
                .bind(id)
                .bind(expected)
                .execute(mysql_pool(&self.pool)?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update post publication state")?;

        Ok(affected > 0)
    }

    async fn list_published(&self, params: ListParams) -> Result<(Vec<Post>, i64)> {
        let filter = PostFilter {
            owner_id: None,
            is_published: true,
        };
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(sqlite_pool(&self.pool)?, filter, params).await,
            DatabaseDriver::Mysql => list_posts_mysql(mysql_pool(&self.pool)?, filter, params).await,
        }
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        is_published: bool,
        params: ListParams,
    ) -> Result<(Vec<Post>, i64)> {
        let filter = PostFilter {
            owner_id: Some(owner_id),
            is_published,
        };
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(sqlite_pool(&self.pool)?, filter, params).await,
            DatabaseDriver::Mysql => list_posts_mysql(mysql_pool(&self.pool)?, filter, params).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(mysql_pool(&self.pool)?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete post")?;

        Ok(affected > 0)
    }
}

fn new_post_row(id: i64, owner_id: i64, input: &CreatePostInput, now: chrono::DateTime<Utc>) -> Post {
    Post {
        id,
        owner_id,
        title: input.title.clone(),
        short_description: input.short_description.clone(),
        full_description: input.full_description.clone(),
        image: input.image.clone(),
        is_published: input.is_published,
        published_date: now,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, owner_id: i64, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (owner_id, title, short_description, full_description, image, is_published, published_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(owner_id)
    .bind(&input.title)
    .bind(&input.short_description)
    .bind(&input.full_description)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(new_post_row(result.last_insert_rowid(), owner_id, input, now))
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    Ok(row.map(|row| row_to_post_sqlite(&row)))
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    filter: PostFilter,
    params: ListParams,
) -> Result<(Vec<Post>, i64)> {
    let count_sql = format!("SELECT COUNT(*) FROM posts {}", filter.where_clause());
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(filter.is_published);
    if let Some(owner_id) = filter.owner_id {
        count_query = count_query.bind(owner_id);
    }
    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    let list_sql = format!(
        "SELECT {} FROM posts {} ORDER BY published_date DESC, id DESC LIMIT ? OFFSET ?",
        POST_COLUMNS,
        filter.where_clause()
    );
    let mut list_query = sqlx::query(&list_sql).bind(filter.is_published);
    if let Some(owner_id) = filter.owner_id {
        list_query = list_query.bind(owner_id);
    }
    let rows = list_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok((rows.iter().map(row_to_post_sqlite).collect(), total))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        short_description: row.get("short_description"),
        full_description: row.get("full_description"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        published_date: row.get("published_date"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, owner_id: i64, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (owner_id, title, short_description, full_description, image, is_published, published_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(owner_id)
    .bind(&input.title)
    .bind(&input.short_description)
    .bind(&input.full_description)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(new_post_row(result.last_insert_id() as i64, owner_id, input, now))
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    Ok(row.map(|row| row_to_post_mysql(&row)))
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    filter: PostFilter,
    params: ListParams,
) -> Result<(Vec<Post>, i64)> {
    let count_sql = format!("SELECT COUNT(*) FROM posts {}", filter.where_clause());
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(filter.is_published);
    if let Some(owner_id) = filter.owner_id {
        count_query = count_query.bind(owner_id);
    }
    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    let list_sql = format!(
        "SELECT {} FROM posts {} ORDER BY published_date DESC, id DESC LIMIT ? OFFSET ?",
        POST_COLUMNS,
        filter.where_clause()
    );
    let mut list_query = sqlx::query(&list_sql).bind(filter.is_published);
    if let Some(owner_id) = filter.owner_id {
        list_query = list_query.bind(owner_id);
    }
    let rows = list_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok((rows.iter().map(row_to_post_mysql).collect(), total))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        short_description: row.get("short_description"),
        full_description: row.get("full_description"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        published_date: row.get("published_date"),
    }
}
