use focustimer_core::recommendation::{apply_recommendation, recommend_from_store};
use focustimer_core::{Config, Recommendation, Settings};
use serde::Serialize;

use super::{open_store, print_json, CliResult};

#[derive(Serialize)]
struct Applied {
    recommendation: Recommendation,
    settings: Settings,
}

pub fn run(apply: bool) -> CliResult {
    let config = Config::load()?;
    let mut db = open_store(&config)?;
    let recommendation = recommend_from_store(&db)?;

    if !apply {
        return print_json(&recommendation);
    }
    let settings = apply_recommendation(&mut db, &recommendation)?;
    print_json(&Applied {
        recommendation,
        settings,
    })
}
