//! In-memory [`Store`] backend.

use std::collections::HashMap;

use super::Store;
use crate::error::Result;

/// HashMap-backed store. Nothing survives the process; useful for tests and
/// for embedding the engine where persistence is handled elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Store for MemoryStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn kv_set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SessionRecord, Settings, OUTCOME_HISTORY_CAP, SESSION_HISTORY_CAP};
    use crate::timer::{Phase, TimerSnapshot};
    use proptest::prelude::*;

    fn record(ts: i64, completed: bool) -> SessionRecord {
        SessionRecord {
            timestamp_millis: ts,
            duration_minutes: 25,
            completed,
        }
    }

    #[test]
    fn empty_store_has_defaults() {
        let store = MemoryStore::new();
        assert_eq!(store.settings().unwrap(), Settings::default());
        assert!(store.timer_snapshot().unwrap().is_none());
        assert_eq!(store.sessions_this_round().unwrap(), 0);
        assert_eq!(store.daily_minutes("2024-01-01").unwrap(), 0);
        assert!(store.recent_sessions().unwrap().is_empty());
        assert_eq!(store.break_ended_at_ms().unwrap(), 0);
        assert_eq!(store.total_sessions().unwrap(), 0);
        assert!(store.last_completion_date().unwrap().is_none());
    }

    #[test]
    fn settings_are_clamped_on_write_and_read() {
        let mut store = MemoryStore::new();
        let wild = Settings {
            focus_minutes: 120,
            ..Settings::default()
        };
        store.set_settings(&wild).unwrap();
        assert_eq!(store.settings().unwrap().focus_minutes, 60);

        // A record written by someone else, out of range
        store
            .kv_set("settings", r#"{"focus_minutes":0,"short_break_minutes":99}"#)
            .unwrap();
        let read = store.settings().unwrap();
        assert_eq!(read.focus_minutes, 1);
        assert_eq!(read.short_break_minutes, 30);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.kv_set("settings", "{not json").unwrap();
        assert_eq!(store.settings().unwrap(), Settings::default());
    }

    #[test]
    fn idle_snapshot_reads_as_none() {
        let mut store = MemoryStore::new();
        store.persist_timer_state(Phase::Idle, 5_000, true).unwrap();
        assert!(store.timer_snapshot().unwrap().is_none());
        store.persist_timer_state(Phase::Focus, 0, true).unwrap();
        assert!(store.timer_snapshot().unwrap().is_none());
    }

    #[test]
    fn snapshot_field_updates_keep_other_fields() {
        let mut store = MemoryStore::new();
        store
            .persist_timer_state(Phase::ShortBreak, 10_000, true)
            .unwrap();
        store.set_timer_was_running(false).unwrap();
        store.set_timer_end_time(12_000).unwrap();
        assert_eq!(
            store.timer_snapshot().unwrap(),
            Some(TimerSnapshot {
                phase: Phase::ShortBreak,
                end_time_ms: 12_000,
                was_running: false,
            })
        );
        store.clear_timer_state().unwrap();
        store.set_timer_end_time(99).unwrap();
        assert!(store.timer_snapshot().unwrap().is_none());
    }

    #[test]
    fn round_counter_saturates_at_four() {
        let mut store = MemoryStore::new();
        for expected in 1..=4 {
            assert_eq!(store.increment_sessions_this_round().unwrap(), expected);
        }
        assert_eq!(store.increment_sessions_this_round().unwrap(), 4);
        assert_eq!(store.sessions_this_round().unwrap(), 4);
        store.reset_sessions_this_round().unwrap();
        assert_eq!(store.sessions_this_round().unwrap(), 0);
    }

    #[test]
    fn daily_minutes_accumulate_per_day() {
        let mut store = MemoryStore::new();
        store.add_daily_minutes("2024-03-01", 25).unwrap();
        store.add_daily_minutes("2024-03-01", 30).unwrap();
        store.add_daily_minutes("2024-03-02", 5).unwrap();
        assert_eq!(store.daily_minutes("2024-03-01").unwrap(), 55);
        assert_eq!(store.daily_minutes("2024-03-02").unwrap(), 5);
    }

    #[test]
    fn session_history_evicts_oldest_past_cap() {
        let mut store = MemoryStore::new();
        for ts in 0..(SESSION_HISTORY_CAP as i64 + 5) {
            store.add_session_record(record(ts, true)).unwrap();
        }
        let sessions = store.recent_sessions().unwrap();
        assert_eq!(sessions.len(), SESSION_HISTORY_CAP);
        assert_eq!(sessions.first().unwrap().timestamp_millis, 5);
        assert_eq!(
            sessions.last().unwrap().timestamp_millis,
            SESSION_HISTORY_CAP as i64 + 4
        );
    }

    #[test]
    fn outcome_histories_cap_at_twenty() {
        let mut store = MemoryStore::new();
        store.add_break_outcome(true).unwrap();
        for _ in 0..OUTCOME_HISTORY_CAP {
            store.add_break_outcome(false).unwrap();
        }
        let outcomes = store.break_outcomes().unwrap();
        assert_eq!(outcomes.len(), OUTCOME_HISTORY_CAP);
        assert!(outcomes.iter().all(|skipped| !skipped));

        store.add_resume_late_outcome(true).unwrap();
        assert_eq!(store.resume_late_outcomes().unwrap(), vec![true]);
    }

    #[test]
    fn malformed_history_is_discarded() {
        let mut store = MemoryStore::new();
        store.kv_set("focus_sessions", "[{\"oops\":").unwrap();
        assert!(store.recent_sessions().unwrap().is_empty());

        // Appending after corruption starts a fresh sequence
        store.add_session_record(record(7, false)).unwrap();
        assert_eq!(store.recent_sessions().unwrap(), vec![record(7, false)]);
    }

    #[test]
    fn session_records_use_camel_case_on_disk() {
        let mut store = MemoryStore::new();
        store.add_session_record(record(1, true)).unwrap();
        let raw = store.kv_get("focus_sessions").unwrap().unwrap();
        assert!(raw.contains("timestampMillis"));
        assert!(raw.contains("durationMinutes"));
    }

    fn active_phase() -> impl Strategy<Value = Phase> {
        prop_oneof![
            Just(Phase::Focus),
            Just(Phase::ShortBreak),
            Just(Phase::LongBreak),
        ]
    }

    proptest! {
        #[test]
        fn persisted_snapshot_reads_back_exactly(
            phase in active_phase(),
            end in 1i64..i64::MAX / 2,
            running in any::<bool>(),
        ) {
            let mut store = MemoryStore::new();
            store.persist_timer_state(phase, end, running).unwrap();
            let snap = store.timer_snapshot().unwrap().unwrap();
            prop_assert_eq!(snap, TimerSnapshot { phase, end_time_ms: end, was_running: running });
        }

        #[test]
        fn settings_always_read_in_range(focus in any::<u32>(), short in any::<u32>(), long in any::<u32>()) {
            let mut store = MemoryStore::new();
            let settings = Settings {
                focus_minutes: focus,
                short_break_minutes: short,
                long_break_minutes: long,
                ..Settings::default()
            };
            store.set_settings(&settings).unwrap();
            let read = store.settings().unwrap();
            prop_assert!((1..=60).contains(&read.focus_minutes));
            prop_assert!((1..=30).contains(&read.short_break_minutes));
            prop_assert!((1..=60).contains(&read.long_break_minutes));
        }
    }
}
