//! Handles settings for the application.
//!
//! Sources, later ones winning:
//! 1. `settings.toml` (or the file given with `--config`), optional
//! 2. `SPLITCLEAR__*` environment variables, e.g. `SPLITCLEAR__APP__LEVEL=debug`
//! 3. command line overrides (`--database`)
use config::{Config, ConfigError, Environment, File};
use engine::{Currency, QuietHours, ReminderFrequency, ReminderPolicy, ResultEngine};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `database = "memory"` or `database = { sqlite = "splitclear.db" }`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("splitclear.db".to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Reminders {
    pub enabled: bool,
    pub frequency: ReminderFrequency,
    /// `HH:MM`
    pub quiet_start: Option<String>,
    /// `HH:MM`
    pub quiet_end: Option<String>,
}

impl Reminders {
    pub fn policy(&self) -> ResultEngine<ReminderPolicy> {
        let quiet_hours = match (&self.quiet_start, &self.quiet_end) {
            (Some(start), Some(end)) => Some(QuietHours::parse(start, end)?),
            _ => None,
        };
        Ok(ReminderPolicy {
            enabled: self.enabled,
            frequency: self.frequency,
            quiet_hours,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    /// Connect and pool acquire timeout.
    pub database_timeout_secs: u64,
    pub default_currency: Currency,
    pub reminders: Reminders,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: App::default(),
            database: Database::default(),
            database_timeout_secs: 5,
            default_currency: Currency::default(),
            reminders: Reminders::default(),
        }
    }
}

impl Settings {
    pub fn new(config_path: Option<&str>, database: Option<&str>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(
                File::with_name(config_path.unwrap_or(DEFAULT_CONFIG_PATH)).required(false),
            )
            .add_source(Environment::with_prefix("SPLITCLEAR").separator("__"))
            .build()?;

        let mut settings: Settings = settings.try_deserialize()?;
        match database {
            Some(":memory:") => settings.database = Database::Memory,
            Some(path) => settings.database = Database::Sqlite(path.to_string()),
            None => {}
        }
        Ok(settings)
    }
}
