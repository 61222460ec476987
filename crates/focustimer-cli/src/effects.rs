//! Terminal implementations of the timer's side-effect capabilities.

use focustimer_core::clock::to_utc;
use focustimer_core::effects::{
    AlarmScheduler, DeniedDnd, EffectResult, Effects, FeedbackSink, NotificationSink,
};
use focustimer_core::{Config, EffectError};
use tracing::info;

/// Prints "phase ended" notices to stderr.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn show_focus_ended(&mut self) -> EffectResult {
        eprintln!("Focus session complete. Time for a break.");
        Ok(())
    }

    fn show_break_ended(&mut self) -> EffectResult {
        eprintln!("Break is over. Ready to focus?");
        Ok(())
    }
}

/// Terminal bell as the completion sound. Terminals cannot vibrate.
#[derive(Debug)]
pub struct Bell {
    enabled: bool,
}

impl FeedbackSink for Bell {
    fn play_completion_sound(&mut self) -> EffectResult {
        if !self.enabled {
            return Err(EffectError::unavailable("sound"));
        }
        eprint!("\x07");
        Ok(())
    }

    fn vibrate(&mut self) -> EffectResult {
        Err(EffectError::unavailable("vibration"))
    }
}

/// No OS scheduler is available from a one-shot CLI process; the alarm is
/// logged so an external scheduler (cron, systemd timer) can call
/// `focustimer timer fire-alarm --at <ms>`.
#[derive(Debug, Default)]
pub struct LoggedAlarm;

impl AlarmScheduler for LoggedAlarm {
    fn schedule_completion_at(&mut self, end_time_ms: i64) -> EffectResult {
        info!(end_time_ms, at = %to_utc(end_time_ms), "completion alarm requested");
        Ok(())
    }

    fn cancel(&mut self) -> EffectResult {
        info!("completion alarm cancelled");
        Ok(())
    }
}

pub fn terminal_effects(config: &Config) -> Effects {
    Effects::noop()
        .with_alarm(LoggedAlarm)
        .with_notifications(TerminalNotifier)
        .with_dnd(DeniedDnd)
        .with_feedback(Bell {
            enabled: config.alerts.bell,
        })
}
