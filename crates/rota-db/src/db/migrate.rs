//! Embedded schema migrations.

use diesel::Connection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// ## Summary
/// Runs all pending migrations against the given database.
///
/// The migration harness is synchronous, so the work happens on a blocking
/// thread with its own short-lived connection rather than on the async pool.
///
/// ## Errors
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run_pending(database_url: &str) -> anyhow::Result<()> {
    let url = database_url.to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::PgConnection::establish(&url)?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;

        for version in &applied {
            tracing::info!(migration = %version, "Applied migration");
        }

        Ok::<_, anyhow::Error>(())
    })
    .await??;

    Ok(())
}
