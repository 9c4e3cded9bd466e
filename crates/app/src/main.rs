use std::time::Duration;

use clap::Parser;
use migration::{Migrator, MigratorTrait};
use sea_orm::ConnectOptions;
use settings::Database;

mod cli;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = cli::Cli::parse();
    let settings = settings::Settings::new(args.config.as_deref(), args.database.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitclear={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = parse_database(&settings).await.inspect_err(|err| {
        tracing::error!("failed to initialize database: {err}");
    })?;
    let engine = engine::Engine::builder().database(db).build().await?;

    if let Err(err) = cli::run(&engine, &settings, args.command).await {
        tracing::error!("command failed: {err}");
        return Err(err);
    }
    Ok(())
}

async fn parse_database(
    settings: &settings::Settings,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match &settings.database {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
    };
    tracing::debug!(%url, "opening database");

    let timeout = Duration::from_secs(settings.database_timeout_secs);
    let mut options = ConnectOptions::new(url);
    options
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .sqlx_logging(false);

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
