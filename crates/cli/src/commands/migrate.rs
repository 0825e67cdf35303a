//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! basket-cli migrate sessions
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for sessions

use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

use basket_storefront::db;

/// Errors running migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create the `tower_sessions` schema and session table.
///
/// # Errors
///
/// Returns an error if `STOREFRONT_DATABASE_URL` is unset or the database
/// rejects the statements.
pub async fn sessions() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    info!("Connecting to session database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Creating session table...");
    db::migrate_sessions(&pool).await?;

    info!("Session migrations complete!");
    Ok(())
}
