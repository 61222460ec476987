use clap::Subcommand;
use focustimer_core::clock::date_key;
use focustimer_core::{stats, Clock, Config, Store, SystemClock};
use serde::Serialize;

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's focus time and streak
    Today,
    /// All-time stats
    All,
    /// Focus minutes for the last seven days
    Week,
}

#[derive(Serialize)]
struct Today {
    date: String,
    minutes: u32,
    streak_days: u32,
    sessions_this_round: u32,
}

pub fn run(action: StatsAction) -> CliResult {
    let config = Config::load()?;
    let db = open_store(&config)?;
    let now = SystemClock.now_ms();

    match action {
        StatsAction::Today => print_json(&Today {
            date: date_key(now),
            minutes: stats::today_minutes(&db, now)?,
            streak_days: stats::streak(&db, now)?,
            sessions_this_round: db.sessions_this_round()?,
        }),
        StatsAction::All => print_json(&stats::summary(&db, now)?),
        StatsAction::Week => print_json(&stats::last_7_days(&db, now)?),
    }
}
