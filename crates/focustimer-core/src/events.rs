use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change in the timer produces an Event.
/// Front ends subscribe to them; commands also return the event they caused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PhaseStarted {
        phase: Phase,
        end_time_ms: i64,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_ms: i64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: Phase,
        remaining_ms: i64,
        at: DateTime<Utc>,
    },
    /// The user abandoned the active phase.
    TimerReset {
        phase: Phase,
        at: DateTime<Utc>,
    },
    /// A phase ran to its end. `next` is the phase that auto-started, if any.
    PhaseCompleted {
        phase: Phase,
        next: Option<Phase>,
        sessions_this_round: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        remaining_secs: u64,
        is_running: bool,
        sessions_this_round: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::PhaseStarted { at, .. }
            | Event::TimerPaused { at, .. }
            | Event::TimerResumed { at, .. }
            | Event::TimerReset { at, .. }
            | Event::PhaseCompleted { at, .. }
            | Event::StateSnapshot { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::PhaseCompleted {
            phase: Phase::Focus,
            next: Some(Phase::ShortBreak),
            sessions_this_round: 1,
            at: DateTime::<Utc>::default(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_completed");
        assert_eq!(json["phase"], "focus");
        assert_eq!(json["next"], "shortBreak");
        assert_eq!(event.at(), DateTime::<Utc>::default());
    }
}
