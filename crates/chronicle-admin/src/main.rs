//! Chronicle admin entry point.

use std::sync::Arc;

use chronicle_admin::cli::{Cli, Command};
use chronicle_admin::commands;
use chronicle_admin::config::{Config, LogFormat};
use chronicle_admin::error::AppError;
use chronicle_core::repository::AggregateRepository;
use chronicle_event_store::pg_event_store::PgEventStore;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr; stdout carries command output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    let store = PgEventStore::new(pool);

    match cli.command {
        Command::Migrate => {
            store.migrate().await?;
            tracing::info!("migrations applied");
        }
        Command::Query(query) => {
            let repo = AggregateRepository::new(Arc::new(store));
            let mut stdout = std::io::stdout().lock();
            commands::execute(&query, &repo, &mut stdout).await?;
        }
    }

    Ok(())
}
