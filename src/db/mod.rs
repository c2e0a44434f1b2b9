//! Database layer
//!
//! SQLite is the default backend; MySQL is selected with
//! `database.driver: mysql`. Repositories hold a `DynDatabasePool` and branch
//! on `driver()` to the backend-specific query functions.
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! let comments = SqlxCommentRepository::boxed(pool.clone());
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

use anyhow::{Context, Result};
use sqlx::{MySqlPool, SqlitePool};

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// The SQLite pool behind `pool`, or an error if the driver differs
pub(crate) fn sqlite_pool(pool: &DynDatabasePool) -> Result<&SqlitePool> {
    pool.as_sqlite().context("database pool is not SQLite")
}

/// The MySQL pool behind `pool`, or an error if the driver differs
pub(crate) fn mysql_pool(pool: &DynDatabasePool) -> Result<&MySqlPool> {
    pool.as_mysql().context("database pool is not MySQL")
}

/// Whether a repository error was caused by a UNIQUE constraint
pub(crate) fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    })
}
