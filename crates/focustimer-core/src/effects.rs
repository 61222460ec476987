//! Side-effect capabilities the timer engine calls out to.
//!
//! None of these own timer state. Each may fail (permission denied, not
//! available on this platform); the engine logs the failure and carries on,
//! so a missing capability never changes what the timer does.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::EffectError;

pub type EffectResult = Result<(), EffectError>;

/// One-shot completion alarm that fires even when nothing is ticking.
///
/// Fires at least once at or after the scheduled time. Scheduling replaces
/// any pending alarm.
pub trait AlarmScheduler: Send {
    fn schedule_completion_at(&mut self, end_time_ms: i64) -> EffectResult;
    fn cancel(&mut self) -> EffectResult;
}

/// "Phase ended" notifications.
pub trait NotificationSink: Send {
    fn show_focus_ended(&mut self) -> EffectResult;
    fn show_break_ended(&mut self) -> EffectResult;
}

/// Do Not Disturb control. Only focus phases toggle it.
pub trait DndController: Send {
    fn enable_on_focus_start(&mut self) -> EffectResult;
    fn restore_on_focus_end(&mut self) -> EffectResult;
}

/// Completion sound and vibration. The engine only calls these when the
/// matching setting is enabled.
pub trait FeedbackSink: Send {
    fn play_completion_sound(&mut self) -> EffectResult;
    fn vibrate(&mut self) -> EffectResult;
}

/// The bundle of capabilities handed to the engine.
pub struct Effects {
    pub alarm: Box<dyn AlarmScheduler>,
    pub notifications: Box<dyn NotificationSink>,
    pub dnd: Box<dyn DndController>,
    pub feedback: Box<dyn FeedbackSink>,
}

impl Effects {
    /// Every capability as a no-op.
    pub fn noop() -> Self {
        Self {
            alarm: Box::new(Noop),
            notifications: Box::new(Noop),
            dnd: Box::new(Noop),
            feedback: Box::new(Noop),
        }
    }

    pub fn with_alarm(mut self, alarm: impl AlarmScheduler + 'static) -> Self {
        self.alarm = Box::new(alarm);
        self
    }

    pub fn with_notifications(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.notifications = Box::new(sink);
        self
    }

    pub fn with_dnd(mut self, dnd: impl DndController + 'static) -> Self {
        self.dnd = Box::new(dnd);
        self
    }

    pub fn with_feedback(mut self, feedback: impl FeedbackSink + 'static) -> Self {
        self.feedback = Box::new(feedback);
        self
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effects").finish_non_exhaustive()
    }
}

/// Capability that does nothing and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl AlarmScheduler for Noop {
    fn schedule_completion_at(&mut self, end_time_ms: i64) -> EffectResult {
        debug!(end_time_ms, "alarm scheduling not wired");
        Ok(())
    }

    fn cancel(&mut self) -> EffectResult {
        Ok(())
    }
}

impl NotificationSink for Noop {
    fn show_focus_ended(&mut self) -> EffectResult {
        Ok(())
    }

    fn show_break_ended(&mut self) -> EffectResult {
        Ok(())
    }
}

impl DndController for Noop {
    fn enable_on_focus_start(&mut self) -> EffectResult {
        Ok(())
    }

    fn restore_on_focus_end(&mut self) -> EffectResult {
        Ok(())
    }
}

impl FeedbackSink for Noop {
    fn play_completion_sound(&mut self) -> EffectResult {
        Ok(())
    }

    fn vibrate(&mut self) -> EffectResult {
        Ok(())
    }
}

/// DND controller for platforms without notification policy access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedDnd;

impl DndController for DeniedDnd {
    fn enable_on_focus_start(&mut self) -> EffectResult {
        Err(EffectError::permission_denied("dnd"))
    }

    fn restore_on_focus_end(&mut self) -> EffectResult {
        Err(EffectError::permission_denied("dnd"))
    }
}

/// A single capability call seen by a [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectCall {
    ScheduleAlarm(i64),
    CancelAlarm,
    FocusEndedNotice,
    BreakEndedNotice,
    DndEnabled,
    DndRestored,
    Sound,
    Vibrate,
}

/// Records every capability call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<EffectCall>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An [`Effects`] bundle whose every capability records into this log.
    pub fn effects(&self) -> Effects {
        Effects {
            alarm: Box::new(self.clone()),
            notifications: Box::new(self.clone()),
            dnd: Box::new(self.clone()),
            feedback: Box::new(self.clone()),
        }
    }

    pub fn calls(&self) -> Vec<EffectCall> {
        self.log().clone()
    }

    pub fn count(&self, call: EffectCall) -> usize {
        self.log().iter().filter(|c| **c == call).count()
    }

    pub fn clear(&self) {
        self.log().clear();
    }

    fn log(&self) -> MutexGuard<'_, Vec<EffectCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: EffectCall) -> EffectResult {
        self.log().push(call);
        Ok(())
    }
}

impl AlarmScheduler for Recorder {
    fn schedule_completion_at(&mut self, end_time_ms: i64) -> EffectResult {
        self.record(EffectCall::ScheduleAlarm(end_time_ms))
    }

    fn cancel(&mut self) -> EffectResult {
        self.record(EffectCall::CancelAlarm)
    }
}

impl NotificationSink for Recorder {
    fn show_focus_ended(&mut self) -> EffectResult {
        self.record(EffectCall::FocusEndedNotice)
    }

    fn show_break_ended(&mut self) -> EffectResult {
        self.record(EffectCall::BreakEndedNotice)
    }
}

impl DndController for Recorder {
    fn enable_on_focus_start(&mut self) -> EffectResult {
        self.record(EffectCall::DndEnabled)
    }

    fn restore_on_focus_end(&mut self) -> EffectResult {
        self.record(EffectCall::DndRestored)
    }
}

impl FeedbackSink for Recorder {
    fn play_completion_sound(&mut self) -> EffectResult {
        self.record(EffectCall::Sound)
    }

    fn vibrate(&mut self) -> EffectResult {
        self.record(EffectCall::Vibrate)
    }
}
