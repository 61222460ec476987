use clap::Subcommand;
use focustimer_core::{Config, Settings, Store};

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the timer settings
    Show,
    /// Change one setting (minutes are clamped to their range)
    Set {
        /// Setting key (e.g. "focus_minutes", "auto_start_next")
        key: String,
        /// New value
        value: String,
    },
    /// Restore default settings
    Reset,
}

pub fn run(action: SettingsAction) -> CliResult {
    let config = Config::load()?;
    let mut db = open_store(&config)?;

    match action {
        SettingsAction::Show => {}
        SettingsAction::Set { key, value } => {
            let mut settings = db.settings()?;
            settings.set(&key, &value)?;
            db.set_settings(&settings)?;
        }
        SettingsAction::Reset => db.set_settings(&Settings::default())?,
    }
    print_json(&db.settings()?)
}
