//! Database migration command.
//!
//! Applies the document schema from `crates/api/migrations/` and creates the
//! `tower_sessions` table used for OAuth handshake sessions.

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use vendora_api::db;

/// Migration errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails, or
/// a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    apply(&pool).await?;
    Ok(())
}

async fn apply(pool: &sqlx::PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running document migrations...");
    sqlx::migrate!("../api/migrations").run(pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
