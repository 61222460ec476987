//! Rule-based focus and break length suggestions.
//!
//! Pure functions of recent history: the same inputs always give the same
//! output. Ratios are compared as exact integer fractions so boundary
//! cases (exactly 80% or 50% completion) never depend on float rounding.
//!
//! ## Focus length
//!
//! 1. Window = last 7 session records.
//! 2. Rule base: current length clamped to 15..=45, then +5 when at least
//!    80% completed, otherwise -5 when at most 50% completed or 3+ early stops.
//! 3. Refinement: `delta = round(0.6 * (rate - 0.5) * 10)`, half away from
//!    zero, added to the base and clamped to 15..=45 again.
//!
//! ## Break length
//!
//! Current short break clamped to 5..=10, +2 when breaks are skipped 40%+ of
//! the time, -1 when focus restarts late 50%+ of the time.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::{break_skip_rate, resume_late_rate};
use crate::storage::{SessionRecord, Settings, Store};

pub const MIN_FOCUS_MINUTES: u32 = 15;
pub const MAX_FOCUS_MINUTES: u32 = 45;
pub const FOCUS_STEP_MINUTES: u32 = 5;
pub const ROLLING_WINDOW: usize = 7;
pub const EARLY_STOPS_TO_REDUCE: usize = 3;

pub const MIN_BREAK_MINUTES: u32 = 5;
pub const MAX_BREAK_MINUTES: u32 = 10;
const SKIP_RATE_TO_LENGTHEN: f64 = 0.40;
const LATE_RATE_TO_SHORTEN: f64 = 0.50;

const INCONSISTENT_STD_DEV: f64 = 12.0;
const SHORT_FOCUS_AVG_BELOW: f64 = 20.0;
const DEEP_FOCUS_AVG_FROM: f64 = 30.0;

/// How the recent window looks. Only picks the message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusProfile {
    ShortFocus,
    DeepFocus,
    Inconsistent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended_focus_minutes: u32,
    /// `None` when there is no break history at all.
    pub recommended_short_break_minutes: Option<u32>,
    /// Empty when there is no session history.
    pub message: String,
    pub completion_rate_percent: Option<u32>,
    pub rolling_avg_minutes: Option<f64>,
    pub profile: Option<FocusProfile>,
}

/// Compute a recommendation from the tail of `sessions` (oldest first).
pub fn recommend(
    sessions: &[SessionRecord],
    current_focus_minutes: u32,
    break_skip_rate: Option<f64>,
    resume_late_rate: Option<f64>,
    current_short_break_minutes: u32,
) -> Recommendation {
    let recommended_short_break_minutes =
        recommend_break(break_skip_rate, resume_late_rate, current_short_break_minutes);

    let window = &sessions[sessions.len().saturating_sub(ROLLING_WINDOW)..];
    if window.is_empty() {
        return Recommendation {
            recommended_focus_minutes: current_focus_minutes,
            recommended_short_break_minutes,
            message: String::new(),
            completion_rate_percent: None,
            rolling_avg_minutes: None,
            profile: None,
        };
    }

    let total = window.len();
    let completed = window.iter().filter(|s| s.completed).count();
    let early_stops = total - completed;
    let durations: Vec<f64> = window.iter().map(|s| f64::from(s.duration_minutes)).collect();
    let rolling_avg = durations.iter().sum::<f64>() / total as f64;

    let high_completion = 5 * completed >= 4 * total;
    let low_completion = 2 * completed <= total;

    let mut base = current_focus_minutes.clamp(MIN_FOCUS_MINUTES, MAX_FOCUS_MINUTES);
    if high_completion {
        base = (base + FOCUS_STEP_MINUTES).min(MAX_FOCUS_MINUTES);
    } else if low_completion || early_stops >= EARLY_STOPS_TO_REDUCE {
        base = base
            .saturating_sub(FOCUS_STEP_MINUTES)
            .max(MIN_FOCUS_MINUTES);
    }

    let recommended = (i64::from(base) + formula_delta(completed, total)).clamp(
        i64::from(MIN_FOCUS_MINUTES),
        i64::from(MAX_FOCUS_MINUTES),
    ) as u32;

    let profile = classify(&durations, rolling_avg, completed, total);

    Recommendation {
        recommended_focus_minutes: recommended,
        recommended_short_break_minutes,
        message: message(recommended, profile),
        completion_rate_percent: Some((completed * 100 / total) as u32),
        rolling_avg_minutes: Some(rolling_avg),
        profile: Some(profile),
    }
}

/// `round(0.6 * (completed/total - 0.5) * 10)` evaluated exactly as
/// `3 * (2c - n) / n`, rounding halves away from zero.
fn formula_delta(completed: usize, total: usize) -> i64 {
    let numerator = 3 * (2 * completed as i64 - total as i64);
    let denominator = total as i64;
    let magnitude = (2 * numerator.abs() + denominator) / (2 * denominator);
    magnitude * numerator.signum()
}

fn classify(durations: &[f64], rolling_avg: f64, completed: usize, total: usize) -> FocusProfile {
    let variance = durations
        .iter()
        .map(|d| (d - rolling_avg).powi(2))
        .sum::<f64>()
        / durations.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev >= INCONSISTENT_STD_DEV || 2 * completed < total {
        FocusProfile::Inconsistent
    } else if rolling_avg < SHORT_FOCUS_AVG_BELOW {
        FocusProfile::ShortFocus
    } else if rolling_avg >= DEEP_FOCUS_AVG_FROM && 5 * completed >= 4 * total {
        FocusProfile::DeepFocus
    } else {
        FocusProfile::Inconsistent
    }
}

fn message(minutes: u32, profile: FocusProfile) -> String {
    let lead = format!("Based on your recent sessions, {minutes} minutes works best for you.");
    match profile {
        FocusProfile::DeepFocus => format!("{lead} You are finishing long sessions consistently."),
        FocusProfile::ShortFocus => format!("{lead} Shorter sessions fit your current rhythm."),
        FocusProfile::Inconsistent => {
            format!("{lead} A steady length can help you finish more sessions.")
        }
    }
}

/// Suggested short-break length, or `None` when neither rate is known.
pub fn recommend_break(
    break_skip_rate: Option<f64>,
    resume_late_rate: Option<f64>,
    current_short_break_minutes: u32,
) -> Option<u32> {
    if break_skip_rate.is_none() && resume_late_rate.is_none() {
        return None;
    }
    let mut minutes = current_short_break_minutes.clamp(MIN_BREAK_MINUTES, MAX_BREAK_MINUTES);
    if break_skip_rate.is_some_and(|rate| rate >= SKIP_RATE_TO_LENGTHEN) {
        minutes = (minutes + 2).min(MAX_BREAK_MINUTES);
    }
    if resume_late_rate.is_some_and(|rate| rate >= LATE_RATE_TO_SHORTEN) {
        minutes = minutes.saturating_sub(1).max(MIN_BREAK_MINUTES);
    }
    Some(minutes)
}

/// Recommendation from the history and settings held in `store`.
pub fn recommend_from_store<S: Store + ?Sized>(store: &S) -> Result<Recommendation> {
    let settings = store.settings()?;
    Ok(recommend(
        &store.recent_sessions()?,
        settings.focus_minutes,
        break_skip_rate(store)?,
        resume_late_rate(store)?,
        settings.short_break_minutes,
    ))
}

/// Write the recommended lengths into the stored settings.
pub fn apply_recommendation<S: Store + ?Sized>(
    store: &mut S,
    recommendation: &Recommendation,
) -> Result<Settings> {
    let mut settings =
        store
            .settings()?
            .with_focus_minutes(i64::from(recommendation.recommended_focus_minutes));
    if let Some(minutes) = recommendation.recommended_short_break_minutes {
        settings = settings.with_short_break_minutes(i64::from(minutes));
    }
    store.set_settings(&settings)?;
    store.settings()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::storage::MemoryStore;

    fn session(minutes: u32, completed: bool) -> SessionRecord {
        SessionRecord {
            timestamp_millis: 1_700_000_000_000,
            duration_minutes: minutes,
            completed,
        }
    }

    #[test]
    fn all_completed_long_sessions() {
        let sessions = vec![session(32, true); 7];
        let rec = recommend(&sessions, 25, None, None, 5);
        // base 25 + 5, delta round(0.6 * 0.5 * 10) = 3
        assert_eq!(rec.recommended_focus_minutes, 33);
        assert_eq!(rec.completion_rate_percent, Some(100));
        assert_eq!(rec.rolling_avg_minutes, Some(32.0));
        assert_eq!(rec.profile, Some(FocusProfile::DeepFocus));
        assert_eq!(rec.recommended_short_break_minutes, None);
        assert!(rec
            .message
            .starts_with("Based on your recent sessions, 33 minutes works best for you."));

        let capped = recommend(&sessions, 44, None, None, 5);
        assert_eq!(capped.recommended_focus_minutes, 45);
    }

    #[test]
    fn mostly_abandoned_sessions() {
        let sessions = vec![
            session(25, true),
            session(8, false),
            session(10, false),
            session(5, false),
        ];
        let rec = recommend(&sessions, 25, None, None, 5);
        // base 25 - 5, delta -1.5 rounds away from zero to -2
        assert_eq!(rec.recommended_focus_minutes, 18);
        assert_eq!(rec.completion_rate_percent, Some(25));
        assert_eq!(rec.profile, Some(FocusProfile::Inconsistent));

        let floored = recommend(&sessions, 15, None, None, 5);
        assert_eq!(floored.recommended_focus_minutes, 15);
    }

    #[test]
    fn formula_delta_rounds_half_away_from_zero() {
        assert_eq!(formula_delta(7, 7), 3);
        assert_eq!(formula_delta(0, 7), -3);
        assert_eq!(formula_delta(1, 4), -2);
        assert_eq!(formula_delta(3, 4), 2);
        assert_eq!(formula_delta(2, 4), 0);
        assert_eq!(formula_delta(4, 7), 0);
        assert_eq!(formula_delta(5, 7), 1);
    }

    #[test]
    fn middling_completion_keeps_base() {
        // 5 of 7: above 50%, below 80%, two early stops.
        let mut sessions = vec![session(25, true); 5];
        sessions.push(session(10, false));
        sessions.push(session(12, false));
        let rec = recommend(&sessions, 25, None, None, 5);
        assert_eq!(rec.recommended_focus_minutes, 26);
    }

    #[test]
    fn exactly_eighty_percent_counts_as_high() {
        let mut sessions = vec![session(25, true); 4];
        sessions.push(session(20, false));
        let rec = recommend(&sessions, 25, None, None, 5);
        // base 30, delta round(1.8) = 2
        assert_eq!(rec.recommended_focus_minutes, 32);
    }

    #[test]
    fn only_last_seven_sessions_count() {
        let mut sessions = vec![session(5, false); 10];
        sessions.extend(vec![session(25, true); 7]);
        let rec = recommend(&sessions, 25, None, None, 5);
        assert_eq!(rec.completion_rate_percent, Some(100));
        assert_eq!(rec.recommended_focus_minutes, 33);
    }

    #[test]
    fn short_focus_profile() {
        let sessions = vec![session(15, true); 6];
        let rec = recommend(&sessions, 15, None, None, 5);
        assert_eq!(rec.profile, Some(FocusProfile::ShortFocus));
    }

    #[test]
    fn scattered_lengths_are_inconsistent() {
        let sessions = vec![
            session(5, true),
            session(45, true),
            session(5, true),
            session(45, true),
        ];
        let rec = recommend(&sessions, 25, None, None, 5);
        assert_eq!(rec.profile, Some(FocusProfile::Inconsistent));
    }

    #[test]
    fn empty_history_keeps_current_length() {
        let rec = recommend(&[], 50, Some(0.5), None, 5);
        assert_eq!(rec.recommended_focus_minutes, 50);
        assert!(rec.message.is_empty());
        assert_eq!(rec.completion_rate_percent, None);
        assert_eq!(rec.rolling_avg_minutes, None);
        assert_eq!(rec.profile, None);
        assert_eq!(rec.recommended_short_break_minutes, Some(7));

        let bare = recommend(&[], 25, None, None, 5);
        assert_eq!(bare.recommended_short_break_minutes, None);
    }

    #[test]
    fn break_adjustments_stack() {
        assert_eq!(recommend_break(Some(0.5), Some(0.6), 5), Some(6));
        assert_eq!(recommend_break(Some(0.4), None, 9), Some(10));
        assert_eq!(recommend_break(None, Some(0.5), 5), Some(5));
        assert_eq!(recommend_break(Some(0.1), Some(0.1), 20), Some(10));
        assert_eq!(recommend_break(Some(0.0), None, 1), Some(5));
        assert_eq!(recommend_break(None, None, 7), None);
    }

    #[test]
    fn recommend_from_store_uses_history_and_settings() {
        let mut store = MemoryStore::new();
        for _ in 0..7 {
            store.add_session_record(session(32, true)).unwrap();
        }
        store.add_break_outcome(true).unwrap();
        store.add_break_outcome(false).unwrap();
        store.add_resume_late_outcome(true).unwrap();
        store.add_resume_late_outcome(false).unwrap();

        let rec = recommend_from_store(&store).unwrap();
        assert_eq!(rec.recommended_focus_minutes, 33);
        assert_eq!(rec.recommended_short_break_minutes, Some(6));

        let settings = apply_recommendation(&mut store, &rec).unwrap();
        assert_eq!(settings.focus_minutes, 33);
        assert_eq!(settings.short_break_minutes, 6);
        assert_eq!(store.settings().unwrap(), settings);
    }

    fn arb_sessions() -> impl Strategy<Value = Vec<SessionRecord>> {
        prop::collection::vec(
            (0u32..=60, any::<bool>()).prop_map(|(m, c)| session(m, c)),
            0..30,
        )
    }

    proptest! {
        #[test]
        fn recommend_is_deterministic(
            sessions in arb_sessions(),
            focus in 1u32..=60,
            skip in prop::option::of(0.0f64..=1.0),
            late in prop::option::of(0.0f64..=1.0),
            short in 1u32..=30,
        ) {
            let a = recommend(&sessions, focus, skip, late, short);
            let b = recommend(&sessions, focus, skip, late, short);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn recommendation_stays_in_bounds(
            sessions in arb_sessions(),
            focus in 1u32..=60,
            skip in prop::option::of(0.0f64..=1.0),
            late in prop::option::of(0.0f64..=1.0),
            short in 1u32..=30,
        ) {
            let rec = recommend(&sessions, focus, skip, late, short);
            if sessions.is_empty() {
                prop_assert_eq!(rec.recommended_focus_minutes, focus);
            } else {
                prop_assert!((MIN_FOCUS_MINUTES..=MAX_FOCUS_MINUTES)
                    .contains(&rec.recommended_focus_minutes));
                prop_assert!(!rec.message.is_empty());
            }
            if let Some(minutes) = rec.recommended_short_break_minutes {
                prop_assert!((MIN_BREAK_MINUTES..=MAX_BREAK_MINUTES).contains(&minutes));
            }
            prop_assert_eq!(
                rec.recommended_short_break_minutes.is_none(),
                skip.is_none() && late.is_none()
            );
        }
    }
}
