//! Timer phase state machine.
//!
//! The engine is wall-clock based. Remaining time is always recomputed from
//! the absolute end time in the persisted [`TimerSnapshot`], never
//! decremented in memory, so missed ticks, pauses and process suspension
//! introduce no drift. The engine does not spawn anything: the caller (see
//! [`TimerService`](super::TimerService)) calls `tick()` about once a second
//! while [`TimerEngine::is_ticking`] is true.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Focus|ShortBreak|LongBreak (running) <-> (paused)
//!      -> completion -> Idle | next phase (auto-start)
//!      -> reset      -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Database::open()?, SystemClock, Effects::noop())?;
//! engine.start_phase(Phase::Focus)?;
//! // Once a second while engine.is_ticking():
//! engine.tick()?; // Some(Event::PhaseCompleted { .. }) when the phase ends
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::phase::{Phase, TimerSnapshot};
use crate::clock::{date_key, to_utc, Clock, MILLIS_PER_MINUTE};
use crate::effects::{EffectResult, Effects};
use crate::error::Result;
use crate::events::Event;
use crate::storage::{SessionRecord, Settings, SignalsConfig, Store, MAX_SESSIONS_PER_ROUND};

/// Longest focus duration a reset can record.
const MAX_RECORDED_FOCUS_MINUTES: i64 = 60;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Tunable thresholds for the resume-late signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Starting focus later than this after a break ended counts as late.
    pub resume_late_threshold_ms: i64,
    /// Breaks that ended longer ago than this are unrelated and ignored.
    pub resume_late_window_ms: i64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            resume_late_threshold_ms: 60_000,
            resume_late_window_ms: 24 * 60 * 60 * 1000,
        }
    }
}

impl From<&SignalsConfig> for EngineOptions {
    fn from(cfg: &SignalsConfig) -> Self {
        let secs = i64::try_from(cfg.resume_late_threshold_secs).unwrap_or(i64::MAX / 1000);
        let hours = i64::try_from(cfg.resume_late_window_hours).unwrap_or(i64::MAX / 3_600_000);
        Self {
            resume_late_threshold_ms: secs.saturating_mul(1000),
            resume_late_window_ms: hours.saturating_mul(3_600_000),
        }
    }
}

/// Read-only view of the timer for front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerView {
    pub phase: Phase,
    pub remaining_secs: u64,
    pub is_running: bool,
    pub sessions_this_round: u32,
}

impl TimerView {
    /// Remaining time as `MM:SS`.
    pub fn format_remaining(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_secs / 60,
            self.remaining_secs % 60
        )
    }
}

fn remaining_secs(remaining_ms: i64) -> u64 {
    u64::try_from(remaining_ms / 1000).unwrap_or(0)
}

/// Log and swallow a failed side effect.
fn best_effort(capability: &str, result: EffectResult) {
    if let Err(e) = result {
        warn!(capability, error = %e, "side effect skipped");
    }
}

/// Core timer state machine.
pub struct TimerEngine<S: Store> {
    store: S,
    clock: Box<dyn Clock>,
    effects: Effects,
    options: EngineOptions,
    ticking: bool,
    view: watch::Sender<TimerView>,
    events: broadcast::Sender<Event>,
}

impl<S: Store> std::fmt::Debug for TimerEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("view", &*self.view.borrow())
            .field("ticking", &self.ticking)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S: Store> TimerEngine<S> {
    /// Build an engine over `store` and restore whatever phase was persisted.
    ///
    /// This is a cold start: an expired phase is shown, not completed, until
    /// the foreground entry point runs (`on_app_resume`).
    pub fn new(store: S, clock: impl Clock + 'static, effects: Effects) -> Result<Self> {
        let (view, _) = watch::channel(TimerView::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut engine = Self {
            store,
            clock: Box::new(clock),
            effects,
            options: EngineOptions::default(),
            ticking: false,
            view,
            events,
        };
        engine.recover(false)?;
        Ok(engine)
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn view(&self) -> TimerView {
        *self.view.borrow()
    }

    /// Receive every new [`TimerView`].
    pub fn subscribe(&self) -> watch::Receiver<TimerView> {
        self.view.subscribe()
    }

    /// Receive every [`Event`] from now on.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Whether the caller should keep calling [`tick`](Self::tick).
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Tear down the engine and hand back its store.
    pub fn into_store(self) -> S {
        self.store
    }

    pub fn settings(&self) -> Result<Settings> {
        self.store.settings()
    }

    pub fn timer_snapshot(&self) -> Result<Option<TimerSnapshot>> {
        self.store.timer_snapshot()
    }

    /// Full view as an event.
    pub fn snapshot(&self) -> Event {
        let view = self.view();
        Event::StateSnapshot {
            phase: view.phase,
            remaining_secs: view.remaining_secs,
            is_running: view.is_running,
            sessions_this_round: view.sessions_this_round,
            at: to_utc(self.clock.now_ms()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start `target` from its full configured length. Starting `Idle` is
    /// a no-op.
    pub fn start_phase(&mut self, target: Phase) -> Result<Option<Event>> {
        if target == Phase::Idle {
            return Ok(None);
        }
        let now = self.clock.now_ms();
        let settings = self.store.settings()?;

        if target.is_focus() {
            self.record_resume_signal(now)?;
            best_effort("dnd", self.effects.dnd.enable_on_focus_start());
        }

        let duration_ms = target.duration_ms(&settings);
        let end_time_ms = now + duration_ms;
        self.store.persist_timer_state(target, end_time_ms, true)?;
        best_effort(
            "alarm",
            self.effects.alarm.schedule_completion_at(end_time_ms),
        );
        self.ticking = true;

        let sessions_this_round = self.store.sessions_this_round()?;
        self.publish(TimerView {
            phase: target,
            remaining_secs: remaining_secs(duration_ms),
            is_running: true,
            sessions_this_round,
        });
        info!(phase = %target, end_time_ms, "phase started");

        let event = Event::PhaseStarted {
            phase: target,
            end_time_ms,
            duration_secs: remaining_secs(duration_ms),
            at: to_utc(now),
        };
        self.emit(&event);
        Ok(Some(event))
    }

    /// Stop ticking and freeze the display. No-op when idle or already paused.
    pub fn pause(&mut self) -> Result<Option<Event>> {
        let Some(snap) = self.store.timer_snapshot()? else {
            return Ok(None);
        };
        if !snap.was_running && !self.ticking {
            return Ok(None);
        }

        self.ticking = false;
        best_effort("alarm", self.effects.alarm.cancel());
        if snap.phase.is_focus() {
            best_effort("dnd", self.effects.dnd.restore_on_focus_end());
        }
        self.store
            .persist_timer_state(snap.phase, snap.end_time_ms, false)?;

        let now = self.clock.now_ms();
        let remaining_ms = snap.remaining_ms(now);
        let sessions_this_round = self.store.sessions_this_round()?;
        self.publish(TimerView {
            phase: snap.phase,
            remaining_secs: remaining_secs(remaining_ms),
            is_running: false,
            sessions_this_round,
        });
        info!(phase = %snap.phase, remaining_ms, "timer paused");

        let event = Event::TimerPaused {
            phase: snap.phase,
            remaining_ms,
            at: to_utc(now),
        };
        self.emit(&event);
        Ok(Some(event))
    }

    /// Continue towards the unchanged end time. If it already passed, run
    /// the completion transition instead.
    pub fn resume(&mut self) -> Result<Option<Event>> {
        let Some(snap) = self.store.timer_snapshot()? else {
            return Ok(None);
        };
        if self.ticking {
            return Ok(None);
        }
        let now = self.clock.now_ms();
        if snap.is_expired(now) {
            return self.complete(snap);
        }

        if snap.phase.is_focus() {
            best_effort("dnd", self.effects.dnd.enable_on_focus_start());
        }
        self.store
            .persist_timer_state(snap.phase, snap.end_time_ms, true)?;
        best_effort(
            "alarm",
            self.effects.alarm.schedule_completion_at(snap.end_time_ms),
        );
        self.ticking = true;

        let remaining_ms = snap.remaining_ms(now);
        let sessions_this_round = self.store.sessions_this_round()?;
        self.publish(TimerView {
            phase: snap.phase,
            remaining_secs: remaining_secs(remaining_ms),
            is_running: true,
            sessions_this_round,
        });
        info!(phase = %snap.phase, remaining_ms, "timer resumed");

        let event = Event::TimerResumed {
            phase: snap.phase,
            remaining_ms,
            at: to_utc(now),
        };
        self.emit(&event);
        Ok(Some(event))
    }

    /// Abandon the active phase and return to `Idle`.
    ///
    /// An abandoned focus phase is recorded as an incomplete session with the
    /// minutes actually spent; an abandoned break counts as skipped.
    pub fn reset(&mut self) -> Result<Option<Event>> {
        let snap = self.store.timer_snapshot()?;
        self.ticking = false;
        best_effort("alarm", self.effects.alarm.cancel());

        let now = self.clock.now_ms();
        let phase = snap.map(|s| s.phase).unwrap_or(Phase::Idle);
        if let Some(snap) = snap {
            if snap.phase.is_focus() {
                best_effort("dnd", self.effects.dnd.restore_on_focus_end());
                let settings = self.store.settings()?;
                let started_at = snap.end_time_ms - Phase::Focus.duration_ms(&settings);
                let elapsed_min = ((now - started_at) / MILLIS_PER_MINUTE)
                    .clamp(0, MAX_RECORDED_FOCUS_MINUTES);
                self.store.add_session_record(SessionRecord {
                    timestamp_millis: now,
                    duration_minutes: elapsed_min as u32,
                    completed: false,
                })?;
            } else if snap.phase.is_break() {
                self.store.add_break_outcome(true)?;
            }
        }

        self.store.clear_timer_state()?;
        self.publish_idle()?;
        info!(%phase, "timer reset");

        let event = Event::TimerReset {
            phase,
            at: to_utc(now),
        };
        self.emit(&event);
        Ok(Some(event))
    }

    /// Call about once a second while [`is_ticking`](Self::is_ticking).
    /// Returns `Some(Event::PhaseCompleted)` when the phase ends.
    pub fn tick(&mut self) -> Result<Option<Event>> {
        if !self.ticking {
            return Ok(None);
        }
        let Some(snap) = self.store.timer_snapshot()? else {
            // Completed or reset by another owner of the store (e.g. the alarm path).
            debug!("snapshot gone while ticking; stopping");
            self.ticking = false;
            self.publish_idle()?;
            return Ok(None);
        };
        let now = self.clock.now_ms();
        let remaining_ms = snap.remaining_ms(now);
        // A pause from another owner wins over expiry; resume runs the catch-up.
        if !snap.was_running {
            debug!("snapshot paused by another owner; stopping");
            self.ticking = false;
        } else if remaining_ms == 0 {
            return self.complete(snap);
        } else {
            self.store.set_timer_end_time(snap.end_time_ms)?;
        }

        let sessions_this_round = self.store.sessions_this_round()?;
        self.publish(TimerView {
            phase: snap.phase,
            remaining_secs: remaining_secs(remaining_ms),
            is_running: self.ticking,
            sessions_this_round,
        });
        Ok(None)
    }

    /// External alarm callback. The fire is advisory: it only completes the
    /// phase if the persisted snapshot still matches and has expired.
    /// `scheduled_for` is the end time the alarm was armed with, when known.
    pub fn alarm_fired(&mut self, scheduled_for: Option<i64>) -> Result<Option<Event>> {
        let Some(snap) = self.store.timer_snapshot()? else {
            debug!("ignoring alarm: timer idle");
            return Ok(None);
        };
        if scheduled_for.is_some_and(|at| at != snap.end_time_ms) {
            debug!(?scheduled_for, end_time_ms = snap.end_time_ms, "ignoring stale alarm");
            return Ok(None);
        }
        if !snap.was_running {
            debug!("ignoring alarm: timer paused");
            return Ok(None);
        }
        if !snap.is_expired(self.clock.now_ms()) {
            debug!(end_time_ms = snap.end_time_ms, "ignoring early alarm");
            return Ok(None);
        }
        self.complete(snap)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Completion transition for the phase described by `snap`.
    pub(super) fn complete(&mut self, snap: TimerSnapshot) -> Result<Option<Event>> {
        self.ticking = false;
        best_effort("alarm", self.effects.alarm.cancel());

        let now = self.clock.now_ms();
        let settings = self.store.settings()?;
        let phase = snap.phase;

        if phase.is_focus() {
            self.record_focus_completion(now, &settings)?;
            best_effort("dnd", self.effects.dnd.restore_on_focus_end());
        } else if phase.is_break() {
            self.store.add_break_outcome(false)?;
            self.store.set_break_ended_at_ms(now)?;
        }

        if settings.sound_enabled {
            best_effort("sound", self.effects.feedback.play_completion_sound());
        }
        if settings.vibration_enabled {
            best_effort("vibration", self.effects.feedback.vibrate());
        }
        match phase {
            Phase::Focus => best_effort("notification", self.effects.notifications.show_focus_ended()),
            Phase::ShortBreak | Phase::LongBreak => {
                best_effort("notification", self.effects.notifications.show_break_ended())
            }
            Phase::Idle => {}
        }

        self.store.clear_timer_state()?;
        if phase == Phase::LongBreak {
            self.store.reset_sessions_this_round()?;
        }
        let sessions_this_round = self.store.sessions_this_round()?;

        let next = if settings.auto_start_next {
            match phase {
                Phase::Focus if sessions_this_round >= MAX_SESSIONS_PER_ROUND => {
                    Some(Phase::LongBreak)
                }
                Phase::Focus => Some(Phase::ShortBreak),
                Phase::ShortBreak | Phase::LongBreak => Some(Phase::Focus),
                Phase::Idle => None,
            }
        } else {
            None
        };
        info!(%phase, ?next, sessions_this_round, "phase completed");

        let event = Event::PhaseCompleted {
            phase,
            next,
            sessions_this_round,
            at: to_utc(now),
        };
        self.emit(&event);

        // Auto-advance publishes its own view; no Idle flicker in between.
        match next {
            Some(next) => {
                self.start_phase(next)?;
            }
            None => self.publish_idle()?,
        }
        Ok(Some(event))
    }

    fn record_focus_completion(&mut self, now: i64, settings: &Settings) -> Result<()> {
        let minutes = settings.focus_minutes.max(1);
        let total = self.store.total_sessions()?;
        self.store.set_total_sessions(total + 1)?;
        let today = date_key(now);
        self.store.add_daily_minutes(&today, minutes)?;
        self.store.set_last_completion_date(&today)?;
        self.store.increment_sessions_this_round()?;
        self.store.add_session_record(SessionRecord {
            timestamp_millis: now,
            duration_minutes: minutes,
            completed: true,
        })?;
        Ok(())
    }

    /// Record whether this focus start came late after the last break, then
    /// clear the break-ended marker.
    fn record_resume_signal(&mut self, now: i64) -> Result<()> {
        let ended_at = self.store.break_ended_at_ms()?;
        if ended_at <= 0 {
            return Ok(());
        }
        let elapsed = now - ended_at;
        if elapsed <= self.options.resume_late_window_ms {
            let late = elapsed > self.options.resume_late_threshold_ms;
            debug!(elapsed, late, "resume-late signal");
            self.store.add_resume_late_outcome(late)?;
        }
        self.store.set_break_ended_at_ms(0)
    }

    pub(super) fn stop_ticking(&mut self) {
        self.ticking = false;
    }

    pub(super) fn publish(&self, view: TimerView) {
        self.view.send_replace(view);
    }

    pub(super) fn publish_idle(&self) -> Result<()> {
        let sessions_this_round = self.store.sessions_this_round()?;
        self.publish(TimerView {
            sessions_this_round,
            ..TimerView::default()
        });
        Ok(())
    }

    pub(super) fn emit(&self, event: &Event) {
        // No subscribers is fine.
        let _ = self.events.send(event.clone());
    }
}
