//! Database connection pool, migrations and the store handle.
//!
//! This module provides utilities for:
//! - Creating and managing a PostgreSQL connection pool
//! - Running database migrations automatically
//! - Bounding every database call with a deadline

use std::{future::Future, time::Duration};

use sqlx::{Pool, Postgres};

use crate::error::AppError;

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// `acquire_timeout` is set to the per-call deadline so a saturated pool
/// fails fast instead of queueing requests indefinitely.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - Cannot connect to PostgreSQL server
/// - Database authentication fails
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(timeout)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so each one runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}

/// Handle to the relational store shared by every service.
///
/// Cheap to clone: the pool is reference counted. Services receive a `Store`
/// in their constructor; nothing reaches the database through global state.
#[derive(Debug, Clone)]
pub struct Store {
    pool: DbPool,
    timeout: Duration,
}

impl Store {
    pub fn new(pool: DbPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run one database-bound operation under the per-call deadline.
    ///
    /// An operation still running when the deadline passes is dropped and
    /// reported as [`AppError::Timeout`]. Dropping an open `sqlx` transaction
    /// rolls it back.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| AppError::Timeout)?
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_reports_timeout_when_deadline_passes() {
        let store = testing::lazy_store();
        let store = Store::new(store.pool().clone(), Duration::from_millis(10));

        let result: Result<(), AppError> = store
            .run(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(AppError::Timeout)));
    }

    #[tokio::test]
    async fn run_passes_through_results_within_deadline() {
        let store = testing::lazy_store();

        let value = store.run(async { Ok::<_, AppError>(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = store
            .run(async { Err::<(), _>(AppError::Expired) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Expired));
    }
}
