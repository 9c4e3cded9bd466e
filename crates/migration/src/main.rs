//! Schema maintenance for a SplitClear database.
//!
//! `migration [up|down|fresh|status] [steps]`, against the SQLite file named
//! by `SPLITCLEAR_DATABASE` (the same variable the app reads) or
//! `DATABASE_URL` for any other connection string.
use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "usage: migration [up|down|fresh|status] [steps]";

fn database_url() -> String {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return url;
    }
    match std::env::var("SPLITCLEAR_DATABASE") {
        Ok(path) if path == ":memory:" => "sqlite::memory:".to_string(),
        Ok(path) => format!("sqlite:{path}?mode=rwc"),
        Err(_) => "sqlite:splitclear.db?mode=rwc".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let steps = match args.next() {
        Some(steps) => Some(
            steps
                .parse::<u32>()
                .map_err(|err| format!("invalid step count '{steps}': {err}\n{USAGE}"))?,
        ),
        None => None,
    };

    let db = Database::connect(database_url()).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, steps).await?,
        // Without a count only the latest migration is reverted.
        "down" => migration::Migrator::down(&db, Some(steps.unwrap_or(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        _ => return Err(USAGE.into()),
    }

    Ok(())
}
