//! # Database Migrations
//!
//! Schema files live in `migrations/` at the crate root and are embedded at
//! compile time. SQLx tracks applied versions in `_sqlx_migrations` and takes
//! an advisory lock, so concurrent starters do not race.

use sqlx::migrate::MigrateError;
use sqlx::PgPool;
use tracing::info;

pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// Run all pending migrations in order
    pub async fn run_all(pool: &PgPool) -> Result<(), MigrateError> {
        let migrator = sqlx::migrate!("./migrations");
        migrator.run(pool).await?;
        info!(
            migrations = migrator.iter().count(),
            "Database schema is up to date"
        );
        Ok(())
    }
}
