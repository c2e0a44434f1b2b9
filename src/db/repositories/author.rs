//! Author repository
//!
//! - `AuthorRepository` trait defining the interface for author data access
//! - `SqlxAuthorRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{Author, NewAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const AUTHOR_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, bio, \
     birth_date, location, profile_photo, is_staff, created_at";

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Insert a new author
    async fn create(&self, author: &NewAuthor) -> Result<Author>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<Author>>;

    /// Match either column, used by login
    async fn get_by_username_or_email(&self, login: &str) -> Result<Option<Author>>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based author repository implementation
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn create(&self, author: &NewAuthor) -> Result<Author> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_author_sqlite(sqlite_pool(&self.pool)?, author).await,
            DatabaseDriver::Mysql => create_author_mysql(mysql_pool(&self.pool)?, author).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        let sql = format!("SELECT {} FROM authors WHERE id = ?", AUTHOR_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_author_sqlite(sqlite_pool(&self.pool)?, &sql, &[BindValue::Id(id)]).await
            }
            DatabaseDriver::Mysql => {
                fetch_author_mysql(mysql_pool(&self.pool)?, &sql, &[BindValue::Id(id)]).await
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Author>> {
        let sql = format!("SELECT {} FROM authors WHERE username = ?", AUTHOR_COLUMNS);
        let binds = [BindValue::Text(username)];
        match self.pool.driver() {
            DatabaseDriver::Sqlite => fetch_author_sqlite(sqlite_pool(&self.pool)?, &sql, &binds).await,
            DatabaseDriver::Mysql => fetch_author_mysql(mysql_pool(&self.pool)?, &sql, &binds).await,
        }
    }

    async fn get_by_username_or_email(&self, login: &str) -> Result<Option<Author>> {
        let sql = format!(
            "SELECT {} FROM authors WHERE username = ? OR email = ? ORDER BY id LIMIT 1",
            AUTHOR_COLUMNS
        );
        let binds = [BindValue::Text(login), BindValue::Text(login)];
        match self.pool.driver() {
            DatabaseDriver::Sqlite => fetch_author_sqlite(sqlite_pool(&self.pool)?, &sql, &binds).await,
            DatabaseDriver::Mysql => fetch_author_mysql(mysql_pool(&self.pool)?, &sql, &binds).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM authors")
                    .fetch_one(sqlite_pool(&self.pool)?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM authors")
                    .fetch_one(mysql_pool(&self.pool)?)
                    .await
            }
        };
        count.context("Failed to count authors")
    }
}

/// Lookup parameter for the shared single-row fetch helpers
enum BindValue<'a> {
    Id(i64),
    Text(&'a str),
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_author_sqlite(pool: &SqlitePool, author: &NewAuthor) -> Result<Author> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO authors (username, email, password_hash, first_name, last_name, bio,
                             birth_date, location, profile_photo, is_staff, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&author.username)
    .bind(&author.email)
    .bind(&author.password_hash)
    .bind(&author.first_name)
    .bind(&author.last_name)
    .bind(&author.bio)
    .bind(author.birth_date)
    .bind(&author.location)
    .bind(&author.profile_photo)
    .bind(author.is_staff)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create author")?;

    Ok(new_author_row(result.last_insert_rowid(), author, now))
}

async fn fetch_author_sqlite(
    pool: &SqlitePool,
    sql: &str,
    binds: &[BindValue<'_>],
) -> Result<Option<Author>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            BindValue::Id(id) => query.bind(*id),
            BindValue::Text(text) => query.bind(*text),
        };
    }

    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get author")?;

    Ok(row.map(|row| row_to_author_sqlite(&row)))
}

fn row_to_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> Author {
    Author {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        bio: row.get("bio"),
        birth_date: row.get("birth_date"),
        location: row.get("location"),
        profile_photo: row.get("profile_photo"),
        is_staff: row.get("is_staff"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_author_mysql(pool: &MySqlPool, author: &NewAuthor) -> Result<Author> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO authors (username, email, password_hash, first_name, last_name, bio,
                             birth_date, location, profile_photo, is_staff, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&author.username)
    .bind(&author.email)
    .bind(&author.password_hash)
    .bind(&author.first_name)
    .bind(&author.last_name)
    .bind(&author.bio)
    .bind(author.birth_date)
    .bind(&author.location)
    .bind(&author.profile_photo)
    .bind(author.is_staff)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create author")?;

    Ok(new_author_row(result.last_insert_id() as i64, author, now))
}

async fn fetch_author_mysql(
    pool: &MySqlPool,
    sql: &str,
    binds: &[BindValue<'_>],
) -> Result<Option<Author>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            BindValue::Id(id) => query.bind(*id),
            BindValue::Text(text) => query.bind(*text),
        };
    }

    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get author")?;

    Ok(row.map(|row| row_to_author_mysql(&row)))
}

fn row_to_author_mysql(row: &sqlx::mysql::MySqlRow) -> Author {
    Author {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        bio: row.get("bio"),
        birth_date: row.get("birth_date"),
        location: row.get("location"),
        profile_photo: row.get("profile_photo"),
        is_staff: row.get("is_staff"),
        created_at: row.get("created_at"),
    }
}

fn new_author_row(id: i64, author: &NewAuthor, created_at: chrono::DateTime<Utc>) -> Author {
    Author {
        id,
        username: author.username.clone(),
        email: author.email.clone(),
        password_hash: author.password_hash.clone(),
        first_name: author.first_name.clone(),
        last_name: author.last_name.clone(),
        bio: author.bio.clone(),
        birth_date: author.birth_date,
        location: author.location.clone(),
        profile_photo: author.profile_photo.clone(),
        is_staff: author.is_staff,
        created_at,
    }
}
