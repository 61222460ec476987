pub mod config;
pub mod recommend;
pub mod settings;
pub mod stats;
pub mod timer;

use focustimer_core::{Config, Database, EngineOptions, SystemClock, TimerEngine};

use crate::effects::terminal_effects;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the store named by the config (`[storage] database`).
pub fn open_store(config: &Config) -> Result<Database, Box<dyn std::error::Error>> {
    Ok(Database::open_at(config.database_path()?)?)
}

/// Engine over the configured store with terminal side effects.
/// Construction runs cold-start recovery.
pub fn open_engine() -> Result<TimerEngine<Database>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = open_store(&config)?;
    let engine = TimerEngine::new(db, SystemClock, terminal_effects(&config))?
        .with_options(EngineOptions::from(&config.signals));
    Ok(engine)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
