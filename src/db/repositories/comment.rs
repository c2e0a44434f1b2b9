//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{Comment, ListParams, NewComment};

const COMMENT_COLUMNS: &str = "id, post_id, author, text, is_published, published_date";

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment
    async fn create(&self, comment: &NewComment) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Set `is_published` to `new` only if it currently equals `expected`.
    /// Returns whether the row changed.
    async fn compare_and_set_published(&self, id: i64, expected: bool, new: bool) -> Result<bool>;

    /// Published comments under a post, newest first
    async fn list_published_for_post(&self, post_id: i64, params: ListParams) -> Result<(Vec<Comment>, i64)>;

    /// Unpublished comments across all posts, newest first
    async fn list_unpublished(&self, params: ListParams) -> Result<(Vec<Comment>, i64)>;
}

/// Comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &NewComment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(sqlite_pool(&self.pool)?, comment).await,
            DatabaseDriver::Mysql => create_mysql(mysql_pool(&self.pool)?, comment).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(sqlite_pool(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(mysql_pool(&self.pool)?, id).await,
        }
    }

    async fn compare_and_set_published(&self, id: i64, expected: bool, new: bool) -> Result<bool> {
        let sql = "UPDATE comments SET is_published = ? WHERE id = ? AND is_published = ?";
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
        .context("Failed to update comment publication state")?;

        Ok(affected > 0)
    }

    async fn list_published_for_post(&self, post_id: i64, params: ListParams) -> Result<(Vec<Comment>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(sqlite_pool(&self.pool)?, Some(post_id), true, params).await
            }
            DatabaseDriver::Mysql => {
                list_mysql(mysql_pool(&self.pool)?, Some(post_id), true, params).await
            }
        }
    }

    async fn list_unpublished(&self, params: ListParams) -> Result<(Vec<Comment>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(sqlite_pool(&self.pool)?, None, false, params).await,
            DatabaseDriver::Mysql => list_mysql(mysql_pool(&self.pool)?, None, false, params).await,
        }
    }
}

fn where_clause(post_id: Option<i64>) -> &'static str {
    match post_id {
        Some(_) => "WHERE is_published = ? AND post_id = ?",
        None => "WHERE is_published = ?",
    }
}

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, comment: &NewComment) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO comments (post_id, author, text, is_published, published_date) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(comment.post_id)
    .bind(&comment.author)
    .bind(&comment.text)
    .bind(comment.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        post_id: comment.post_id,
        author: comment.author.clone(),
        text: comment.text.clone(),
        is_published: comment.is_published,
        published_date: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;

    Ok(row.map(|r| row_to_comment_sqlite(&r)))
}

async fn list_sqlite(
    pool: &SqlitePool,
    post_id: Option<i64>,
    is_published: bool,
    params: ListParams,
) -> Result<(Vec<Comment>, i64)> {
    let count_sql = format!("SELECT COUNT(*) FROM comments {}", where_clause(post_id));
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(is_published);
    if let Some(post_id) = post_id {
        count_query = count_query.bind(post_id);
    }
    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;

    let list_sql = format!(
        "SELECT {} FROM comments {} ORDER BY published_date DESC, id DESC LIMIT ? OFFSET ?",
        COMMENT_COLUMNS,
        where_clause(post_id)
    );
    let mut list_query = sqlx::query(&list_sql).bind(is_published);
    if let Some(post_id) = post_id {
        list_query = list_query.bind(post_id);
    }
    let rows = list_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok((rows.iter().map(row_to_comment_sqlite).collect(), total))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author: row.get("author"),
        text: row.get("text"),
        is_published: row.get("is_published"),
        published_date: row.get("published_date"),
    }
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, comment: &NewComment) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO comments (post_id, author, text, is_published, published_date) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(comment.post_id)
    .bind(&comment.author)
    .bind(&comment.text)
    .bind(comment.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        post_id: comment.post_id,
        author: comment.author.clone(),
        text: comment.text.clone(),
        is_published: comment.is_published,
        published_date: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;

    Ok(row.map(|r| row_to_comment_mysql(&r)))
}

async fn list_mysql(
    pool: &MySqlPool,
    post_id: Option<i64>,
    is_published: bool,
    params: ListParams,
) -> Result<(Vec<Comment>, i64)> {
    let count_sql = format!("SELECT COUNT(*) FROM comments {}", where_clause(post_id));
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(is_published);
    if let Some(post_id) = post_id {
        count_query = count_query.bind(post_id);
    }
    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;

    let list_sql = format!(
        "SELECT {} FROM comments {} ORDER BY published_date DESC, id DESC LIMIT ? OFFSET ?",
        COMMENT_COLUMNS,
        where_clause(post_id)
    );
    let mut list_query = sqlx::query(&list_sql).bind(is_published);
    if let Some(post_id) = post_id {
        list_query = list_query.bind(post_id);
    }
    let rows = list_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok((rows.iter().map(row_to_comment_mysql).collect(), total))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author: row.get("author"),
        text: row.get("text"),
        is_published: row.get("is_published"),
        published_date: row.get("published_date"),
    }
}
