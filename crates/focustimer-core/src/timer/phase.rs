use serde::{Deserialize, Serialize};

use crate::clock::MILLIS_PER_MINUTE;
use crate::storage::Settings;

/// Timer phases. `Idle` means no active session; the other three are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    /// Storage key for this phase.
    pub fn key(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Focus => "focus",
            Phase::ShortBreak => "shortBreak",
            Phase::LongBreak => "longBreak",
        }
    }

    /// Parse a storage key. Unknown or missing keys read as `Idle`.
    pub fn from_key(key: Option<&str>) -> Phase {
        match key {
            Some("focus") => Phase::Focus,
            Some("shortBreak") => Phase::ShortBreak,
            Some("longBreak") => Phase::LongBreak,
            _ => Phase::Idle,
        }
    }

    pub fn is_focus(self) -> bool {
        self == Phase::Focus
    }

    pub fn is_break(self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }

    pub fn is_active(self) -> bool {
        self != Phase::Idle
    }

    /// Configured length of this phase in minutes. `Idle` has none.
    pub fn duration_min(self, settings: &Settings) -> u32 {
        match self {
            Phase::Idle => 0,
            Phase::Focus => settings.focus_minutes,
            Phase::ShortBreak => settings.short_break_minutes,
            Phase::LongBreak => settings.long_break_minutes,
        }
    }

    pub fn duration_ms(self, settings: &Settings) -> i64 {
        i64::from(self.duration_min(settings)) * MILLIS_PER_MINUTE
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Focus => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted description of the active phase.
///
/// `end_time_ms` is an absolute epoch timestamp, never a countdown, so the
/// remaining time can be recomputed after any amount of suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub end_time_ms: i64,
    pub was_running: bool,
}

impl TimerSnapshot {
    /// Milliseconds left at `now_ms`, never negative.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        (self.end_time_ms - now_ms).max(0)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.remaining_ms(now_ms) == 0
    }
}
