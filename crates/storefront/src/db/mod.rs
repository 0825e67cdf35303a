//! Session database.
//!
//! The storefront keeps no business data of its own; carts, lists, customers
//! and orders live on the commerce platform. `PostgreSQL` only stores
//! sessions, in the `tower_sessions.session` table created by
//! [`migrate_sessions`]:
//!
//! ```bash
//! basket-cli migrate sessions
//! ```

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower_sessions_sqlx_store::PostgresStore;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Session store on `pool`.
#[must_use]
pub fn session_store(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
}

/// Create the session schema and table if they do not exist.
///
/// # Errors
///
/// Returns `sqlx::Error` if the statements fail.
pub async fn migrate_sessions(pool: &PgPool) -> Result<(), sqlx::Error> {
    session_store(pool).migrate().await
}

/// Check the database answers.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
