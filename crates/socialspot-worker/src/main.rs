use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use socialspot_storage::Database;
use socialspot_worker::{jobs_from_env, JobKind, Scheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "socialspot-worker")]
#[command(about = "SocialSpot scheduled jobs")]
#[command(version)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every job on its interval until interrupted (default)
    Schedule,
    /// Run one job now and print its result as JSON
    Run {
        /// recreate-events, send-event-reminder, send-event-followup,
        /// send-message-notifications or backup-database
        job: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socialspot_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("socialspot-worker starting...");

    let db = Database::from_url(&cli.database_url)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    tracing::info!("Database migrations applied");

    let jobs = jobs_from_env(&db)?;

    match cli.command.unwrap_or(Command::Schedule) {
        Command::Run { job } => {
            let kind: JobKind = job.parse()?;
            let response = jobs.run(kind, Utc::now()).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.http_status() >= 500 {
                anyhow::bail!("{kind} failed");
            }
        }
        Command::Schedule => {
            if !jobs.config().scheduler_enabled {
                tracing::warn!("SCHEDULER_ENABLED is false, nothing to do");
                return Ok(());
            }
            let scheduler = Scheduler::new(jobs);
            tokio::select! {
                _ = scheduler.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                    scheduler.shutdown();
                }
            }
        }
    }

    tracing::info!("Worker shutdown complete");
    Ok(())
}
