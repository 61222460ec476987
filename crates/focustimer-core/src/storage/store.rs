//! Typed persistent store.
//!
//! A backend only has to provide string key-value primitives; the typed
//! operations (clamping, bounded histories, the timer snapshot record) are
//! provided methods so every backend behaves identically.
//!
//! ## Key space
//!
//! ```text
//! settings                  Settings (JSON, clamped)
//! timer_state               TimerSnapshot (JSON)
//! sessions_this_round       0..=4
//! daily_minutes_YYYY-MM-DD  accumulated focus minutes for that day
//! focus_sessions            [SessionRecord] newest last, cap 30
//! break_outcomes            [bool] true = skipped, cap 20
//! resume_late_outcomes      [bool] true = late, cap 20
//! break_ended_at_millis     0 when cleared
//! total_sessions            lifetime completed focus sessions
//! last_completion_date      YYYY-MM-DD
//! ```

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Settings;
use crate::error::Result;
use crate::timer::{Phase, TimerSnapshot};

pub const SESSION_HISTORY_CAP: usize = 30;
pub const OUTCOME_HISTORY_CAP: usize = 20;
pub const MAX_SESSIONS_PER_ROUND: u32 = 4;

const KEY_SETTINGS: &str = "settings";
const KEY_TIMER_STATE: &str = "timer_state";
const KEY_SESSIONS_THIS_ROUND: &str = "sessions_this_round";
const KEY_DAILY_MINUTES_PREFIX: &str = "daily_minutes_";
const KEY_FOCUS_SESSIONS: &str = "focus_sessions";
const KEY_BREAK_OUTCOMES: &str = "break_outcomes";
const KEY_RESUME_LATE_OUTCOMES: &str = "resume_late_outcomes";
const KEY_BREAK_ENDED_AT: &str = "break_ended_at_millis";
const KEY_TOTAL_SESSIONS: &str = "total_sessions";
const KEY_LAST_COMPLETION_DATE: &str = "last_completion_date";

/// One terminated focus phase, used as recommendation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub timestamp_millis: i64,
    pub duration_minutes: u32,
    pub completed: bool,
}

pub trait Store {
    fn kv_get(&self, key: &str) -> Result<Option<String>>;
    fn kv_set(&mut self, key: &str, value: &str) -> Result<()>;
    fn kv_remove(&mut self, key: &str) -> Result<()>;

    // ── Settings ─────────────────────────────────────────────────────

    fn settings(&self) -> Result<Settings> {
        let settings = match self.kv_get(KEY_SETTINGS)? {
            Some(json) => serde_json::from_str::<Settings>(&json).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable settings record");
                Settings::default()
            }),
            None => Settings::default(),
        };
        Ok(settings.clamped())
    }

    fn set_settings(&mut self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(&settings.clamped())?;
        self.kv_set(KEY_SETTINGS, &json)
    }

    // ── Timer snapshot ───────────────────────────────────────────────

    /// The active phase, if any. An `Idle` record or a non-positive end
    /// time reads as no snapshot.
    fn timer_snapshot(&self) -> Result<Option<TimerSnapshot>> {
        let Some(snapshot) = read_json::<TimerSnapshot, _>(self, KEY_TIMER_STATE)? else {
            return Ok(None);
        };
        if snapshot.phase == Phase::Idle || snapshot.end_time_ms <= 0 {
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    fn persist_timer_state(
        &mut self,
        phase: Phase,
        end_time_ms: i64,
        was_running: bool,
    ) -> Result<()> {
        let snapshot = TimerSnapshot {
            phase,
            end_time_ms,
            was_running,
        };
        self.kv_set(KEY_TIMER_STATE, &serde_json::to_string(&snapshot)?)
    }

    /// Rewrite the end time of the current snapshot. No-op when idle.
    fn set_timer_end_time(&mut self, end_time_ms: i64) -> Result<()> {
        match self.timer_snapshot()? {
            Some(snap) => self.persist_timer_state(snap.phase, end_time_ms, snap.was_running),
            None => Ok(()),
        }
    }

    fn set_timer_was_running(&mut self, was_running: bool) -> Result<()> {
        match self.timer_snapshot()? {
            Some(snap) => self.persist_timer_state(snap.phase, snap.end_time_ms, was_running),
            None => Ok(()),
        }
    }

    fn clear_timer_state(&mut self) -> Result<()> {
        self.kv_remove(KEY_TIMER_STATE)
    }

    // ── Round counter ────────────────────────────────────────────────

    fn sessions_this_round(&self) -> Result<u32> {
        let count = read_parsed::<i64, _>(self, KEY_SESSIONS_THIS_ROUND)?.unwrap_or(0);
        Ok(count.clamp(0, i64::from(MAX_SESSIONS_PER_ROUND)) as u32)
    }

    /// Saturates at [`MAX_SESSIONS_PER_ROUND`]. Returns the new count.
    fn increment_sessions_this_round(&mut self) -> Result<u32> {
        let current = self.sessions_this_round()?;
        if current >= MAX_SESSIONS_PER_ROUND {
            return Ok(current);
        }
        self.kv_set(KEY_SESSIONS_THIS_ROUND, &(current + 1).to_string())?;
        Ok(current + 1)
    }

    fn reset_sessions_this_round(&mut self) -> Result<()> {
        self.kv_set(KEY_SESSIONS_THIS_ROUND, "0")
    }

    // ── Daily minutes ledger ─────────────────────────────────────────

    fn daily_minutes(&self, date_key: &str) -> Result<u32> {
        let key = format!("{KEY_DAILY_MINUTES_PREFIX}{date_key}");
        Ok(read_parsed::<u32, _>(self, &key)?.unwrap_or(0))
    }

    fn add_daily_minutes(&mut self, date_key: &str, minutes: u32) -> Result<()> {
        let total = self.daily_minutes(date_key)?.saturating_add(minutes);
        let key = format!("{KEY_DAILY_MINUTES_PREFIX}{date_key}");
        self.kv_set(&key, &total.to_string())
    }

    // ── Bounded histories ────────────────────────────────────────────

    /// Recent focus sessions, oldest first.
    fn recent_sessions(&self) -> Result<Vec<SessionRecord>> {
        read_sequence(self, KEY_FOCUS_SESSIONS)
    }

    fn add_session_record(&mut self, record: SessionRecord) -> Result<()> {
        append_capped(self, KEY_FOCUS_SESSIONS, record, SESSION_HISTORY_CAP)
    }

    /// `true` = break skipped or reset, `false` = completed naturally.
    fn break_outcomes(&self) -> Result<Vec<bool>> {
        read_sequence(self, KEY_BREAK_OUTCOMES)
    }

    fn add_break_outcome(&mut self, skipped: bool) -> Result<()> {
        append_capped(self, KEY_BREAK_OUTCOMES, skipped, OUTCOME_HISTORY_CAP)
    }

    /// `true` = the next focus started late after a break.
    fn resume_late_outcomes(&self) -> Result<Vec<bool>> {
        read_sequence(self, KEY_RESUME_LATE_OUTCOMES)
    }

    fn add_resume_late_outcome(&mut self, late: bool) -> Result<()> {
        append_capped(self, KEY_RESUME_LATE_OUTCOMES, late, OUTCOME_HISTORY_CAP)
    }

    // ── Scalars ──────────────────────────────────────────────────────

    /// Epoch millis when the last break ended; 0 when cleared.
    fn break_ended_at_ms(&self) -> Result<i64> {
        Ok(read_parsed::<i64, _>(self, KEY_BREAK_ENDED_AT)?.unwrap_or(0))
    }

    fn set_break_ended_at_ms(&mut self, ms: i64) -> Result<()> {
        self.kv_set(KEY_BREAK_ENDED_AT, &ms.to_string())
    }

    fn total_sessions(&self) -> Result<u64> {
        Ok(read_parsed::<u64, _>(self, KEY_TOTAL_SESSIONS)?.unwrap_or(0))
    }

    fn set_total_sessions(&mut self, total: u64) -> Result<()> {
        self.kv_set(KEY_TOTAL_SESSIONS, &total.to_string())
    }

    fn last_completion_date(&self) -> Result<Option<String>> {
        self.kv_get(KEY_LAST_COMPLETION_DATE)
    }

    fn set_last_completion_date(&mut self, date_key: &str) -> Result<()> {
        self.kv_set(KEY_LAST_COMPLETION_DATE, date_key)
    }
}

fn read_parsed<T: FromStr, S: Store + ?Sized>(store: &S, key: &str) -> Result<Option<T>> {
    Ok(store
        .kv_get(key)?
        .and_then(|raw| raw.trim().parse::<T>().ok()))
}

fn read_json<T: DeserializeOwned, S: Store + ?Sized>(store: &S, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.kv_get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "ignoring unreadable record");
            Ok(None)
        }
    }
}

/// Unparseable collections are treated as empty.
fn read_sequence<T: DeserializeOwned, S: Store + ?Sized>(store: &S, key: &str) -> Result<Vec<T>> {
    Ok(read_json::<Vec<T>, _>(store, key)?.unwrap_or_default())
}

fn append_capped<T, S>(store: &mut S, key: &str, item: T, cap: usize) -> Result<()>
where
    T: Serialize + DeserializeOwned,
    S: Store + ?Sized,
{
    let mut items: Vec<T> = read_sequence(store, key)?;
    items.push(item);
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
    store.kv_set(key, &serde_json::to_string(&items)?)
}
