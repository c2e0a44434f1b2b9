//! Contact message repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{ContactInput, ContactMessage};

/// Contact message repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, input: &ContactInput) -> Result<ContactMessage>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>>;
}

/// SQLx-based contact message repository
pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_SQL: &str =
    "INSERT INTO contact_messages (name, email, message, created_at) VALUES (?, ?, ?, ?)";
const SELECT_SQL: &str =
    "SELECT id, name, email, message, created_at FROM contact_messages WHERE id = ?";

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, input: &ContactInput) -> Result<ContactMessage> {
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_SQL)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.message)
                .bind(now)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .map(|r| r.last_insert_rowid()),
            DatabaseDriver::Mysql => sqlx::query(INSERT_SQL)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.message)
                .bind(now)
                .execute(mysql_pool(&self.pool)?)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .context("Failed to create contact message")?;

        Ok(ContactMessage {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            message: input.message.clone(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>> {
        let message = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(SELECT_SQL)
                .bind(id)
                .fetch_optional(sqlite_pool(&self.pool)?)
                .await
                .context("Failed to get contact message")?
                .map(|row| ContactMessage {
                    id: row.get("id"),
                    name: row.get("name"),
                    email: row.get("email"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                }),
            DatabaseDriver::Mysql => sqlx::query(SELECT_SQL)
                .bind(id)
                .fetch_optional(mysql_pool(&self.pool)?)
                .await
                .context("Failed to get contact message")?
                .map(|row| ContactMessage {
                    id: row.get("id"),
                    name: row.get("name"),
                    email: row.get("email"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                }),
        };
        Ok(message)
    }
}
