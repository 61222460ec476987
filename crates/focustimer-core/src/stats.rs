//! Focus statistics derived from the store.
//!
//! Everything here is read-only: the ledgers are written by the timer engine
//! on completion and reset, and only aggregated here.

use chrono::Days;
use serde::{Deserialize, Serialize};

use crate::clock::{format_date_key, local_date};
use crate::error::Result;
use crate::storage::Store;

/// Days scanned backwards when counting a streak.
pub const STREAK_SCAN_DAYS: u64 = 366;

/// Focus minutes on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMinutes {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Short display label, e.g. `Tue 14`.
    pub label: String,
    pub minutes: u32,
    pub is_today: bool,
}

/// Summary shown by `focustimer stats`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_sessions: u64,
    pub today_minutes: u32,
    pub streak_days: u32,
    pub sessions_this_round: u32,
    pub last_completion_date: Option<String>,
    pub break_skip_rate: Option<f64>,
    pub resume_late_rate: Option<f64>,
}

pub fn today_minutes<S: Store + ?Sized>(store: &S, now_ms: i64) -> Result<u32> {
    store.daily_minutes(&format_date_key(local_date(now_ms)))
}

/// Consecutive days with focus time, ending today. Zero when today has none.
pub fn streak<S: Store + ?Sized>(store: &S, now_ms: i64) -> Result<u32> {
    let today = local_date(now_ms);
    let mut streak = 0;
    for offset in 0..STREAK_SCAN_DAYS {
        let Some(day) = today.checked_sub_days(Days::new(offset)) else {
            break;
        };
        if store.daily_minutes(&format_date_key(day))? == 0 {
            break;
        }
        streak += 1;
    }
    Ok(streak)
}

/// The last seven days, oldest first and today last.
pub fn last_7_days<S: Store + ?Sized>(store: &S, now_ms: i64) -> Result<Vec<DayMinutes>> {
    let today = local_date(now_ms);
    let mut days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let Some(day) = today.checked_sub_days(Days::new(offset)) else {
            continue;
        };
        let date = format_date_key(day);
        days.push(DayMinutes {
            minutes: store.daily_minutes(&date)?,
            label: day.format("%a %-d").to_string(),
            is_today: offset == 0,
            date,
        });
    }
    Ok(days)
}

/// Share of `true` entries, `None` for an empty sequence.
pub fn true_rate(outcomes: &[bool]) -> Option<f64> {
    if outcomes.is_empty() {
        return None;
    }
    let hits = outcomes.iter().filter(|o| **o).count();
    Some(hits as f64 / outcomes.len() as f64)
}

pub fn break_skip_rate<S: Store + ?Sized>(store: &S) -> Result<Option<f64>> {
    Ok(true_rate(&store.break_outcomes()?))
}

pub fn resume_late_rate<S: Store + ?Sized>(store: &S) -> Result<Option<f64>> {
    Ok(true_rate(&store.resume_late_outcomes()?))
}

pub fn summary<S: Store + ?Sized>(store: &S, now_ms: i64) -> Result<Stats> {
    Ok(Stats {
        total_sessions: store.total_sessions()?,
        today_minutes: today_minutes(store, now_ms)?,
        streak_days: streak(store, now_ms)?,
        sessions_this_round: store.sessions_this_round()?,
        last_completion_date: store.last_completion_date()?,
        break_skip_rate: break_skip_rate(store)?,
        resume_late_rate: resume_late_rate(store)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::date_key;
    use crate::storage::MemoryStore;

    const NOW: i64 = 1_700_000_000_000;

    fn key_days_ago(days: i64) -> String {
        let today = local_date(NOW);
        format_date_key(today - chrono::Duration::days(days))
    }

    #[test]
    fn empty_store_has_no_stats() {
        let store = MemoryStore::new();
        let stats = summary(&store, NOW).unwrap();
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn streak_counts_back_from_today() {
        let mut store = MemoryStore::new();
        for days in 0..3 {
            store.add_daily_minutes(&key_days_ago(days), 25).unwrap();
        }
        store.add_daily_minutes(&key_days_ago(4), 50).unwrap();
        assert_eq!(streak(&store, NOW).unwrap(), 3);
    }

    #[test]
    fn streak_is_zero_without_focus_today() {
        let mut store = MemoryStore::new();
        store.add_daily_minutes(&key_days_ago(1), 25).unwrap();
        store.add_daily_minutes(&key_days_ago(2), 25).unwrap();
        assert_eq!(streak(&store, NOW).unwrap(), 0);
    }

    #[test]
    fn streak_scan_is_bounded() {
        let mut store = MemoryStore::new();
        for days in 0..400 {
            store.add_daily_minutes(&key_days_ago(days), 1).unwrap();
        }
        assert_eq!(streak(&store, NOW).unwrap(), 366);
    }

    #[test]
    fn last_7_days_is_oldest_first() {
        let mut store = MemoryStore::new();
        store.add_daily_minutes(&key_days_ago(6), 10).unwrap();
        store.add_daily_minutes(&key_days_ago(0), 40).unwrap();

        let days = last_7_days(&store, NOW).unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, key_days_ago(6));
        assert_eq!(days[0].minutes, 10);
        assert!(!days[0].is_today);
        assert_eq!(days[6].date, date_key(NOW));
        assert_eq!(days[6].minutes, 40);
        assert!(days[6].is_today);
        assert!(days[1..6].iter().all(|d| d.minutes == 0));
        assert_eq!(today_minutes(&store, NOW).unwrap(), 40);
    }

    #[test]
    fn rates_are_share_of_true() {
        assert_eq!(true_rate(&[]), None);
        assert_eq!(true_rate(&[true, false, false, true]), Some(0.5));

        let mut store = MemoryStore::new();
        assert_eq!(break_skip_rate(&store).unwrap(), None);
        store.add_break_outcome(true).unwrap();
        store.add_break_outcome(false).unwrap();
        store.add_break_outcome(false).unwrap();
        store.add_break_outcome(false).unwrap();
        store.add_resume_late_outcome(true).unwrap();
        assert_eq!(break_skip_rate(&store).unwrap(), Some(0.25));
        assert_eq!(resume_late_rate(&store).unwrap(), Some(1.0));
    }
}
