mod config;
pub mod database;
mod memory;
pub mod migrations;
mod settings;
mod store;

pub use config::{AlertsConfig, Config, LoggingConfig, SignalsConfig, StorageConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use settings::{
    Settings, FOCUS_MINUTES_RANGE, LONG_BREAK_MINUTES_RANGE, SHORT_BREAK_MINUTES_RANGE,
};
pub use store::{
    SessionRecord, Store, MAX_SESSIONS_PER_ROUND, OUTCOME_HISTORY_CAP, SESSION_HISTORY_CAP,
};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// `FOCUSTIMER_HOME` overrides the location entirely. Otherwise this is
/// `~/.config/focustimer[-dev]/`, with `FOCUSTIMER_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSTIMER_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSTIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focustimer-dev")
            } else {
                base_dir.join("focustimer")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
