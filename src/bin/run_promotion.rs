//! # Promotion Runner
//!
//! Operator tool that applies one promotion batch against the configured
//! database and prints the final job as JSON.

use anyhow::Context;
use clap::Parser;
use promotion_core::audit::PgAuditRecorder;
use promotion_core::config::PromotionConfig;
use promotion_core::database::{DatabaseConnection, DatabaseMigrations, PgPromotionGateway};
use promotion_core::logging::init_structured_logging;
use promotion_core::orchestration::{ProcessorSettings, PromotionProcessor};
use promotion_core::registry::JobRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "run-promotion")]
#[command(about = "Apply a promotion batch and report the outcome")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Promotion batch to apply
    batch_id: Uuid,

    /// User the run and its audit entries are attributed to
    user_id: Uuid,

    /// TOML configuration file, layered under PROMOTION_* environment variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Apply pending schema migrations before running
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PromotionConfig::load(path),
        None => PromotionConfig::from_env(),
    }
    .context("failed to load configuration")?;

    init_structured_logging();

    let db = DatabaseConnection::new(&config)
        .await
        .context("failed to connect to the database")?;

    if cli.migrate {
        DatabaseMigrations::run_all(db.pool())
            .await
            .context("failed to run migrations")?;
    }

    let registry = JobRegistry::in_memory(config.job_retention());
    let cleanup = registry.spawn_cleanup_task(config.cleanup_interval());
    let processor = PromotionProcessor::new(
        Arc::new(PgPromotionGateway::new(db.pool().clone())),
        Arc::new(PgAuditRecorder::new(db.pool().clone())),
        registry.clone(),
        ProcessorSettings::from(&config),
    );

    registry.subscribe_to_progress(cli.batch_id, |job| {
        info!(
            batch_id = %job.batch_id,
            status = %job.status,
            processed = job.processed_students,
            total = job.total_students,
            failed = job.failed_students,
            "Promotion progress"
        );
    });

    let handle = processor
        .start_promotion_job(cli.batch_id, cli.user_id)
        .await
        .with_context(|| format!("failed to start promotion batch {}", cli.batch_id))?;
    handle.join().await?;

    let job = processor
        .get_job_progress(cli.batch_id)
        .context("job disappeared from the registry")?;
    println!("{}", serde_json::to_string_pretty(&job)?);

    registry.unsubscribe_from_progress(cli.batch_id);
    cleanup.abort();
    db.close().await;

    if job.status.is_terminal() && job.failed_students == 0 && job.errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!(
            "promotion batch {} finished with {} failed students",
            cli.batch_id,
            job.failed_students
        )
    }
}
