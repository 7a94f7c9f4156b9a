//! Database migration command.
//!
//! ```bash
//! dd-cli migrate
//! ```
//!
//! Applies `crates/server/migrations/` and creates the session table used
//! by the server's session store. Both steps are idempotent.
//!
//! # Environment Variables
//!
//! - `DISHDASH_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] dishdash_server::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = dishdash_server::config::database_url_from_env()?;
    let pool = dishdash_server::db::create_pool(&database_url).await?;

    tracing::info!("Running app migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
