//! Restoring the timer after process death and lifecycle transitions.
//!
//! The persisted snapshot outlives the process. Recovery rebuilds the view
//! from it and, on the foreground entry point, catches up on a phase that
//! expired while nothing was watching. Recovery never auto-starts ticking:
//! a restored phase is shown paused until the user resumes it.

use tracing::{debug, info};

use super::engine::{TimerEngine, TimerView};
use crate::error::Result;
use crate::events::Event;
use crate::storage::Store;

impl<S: Store> TimerEngine<S> {
    /// Rebuild the view from the persisted snapshot.
    ///
    /// With `trigger_completion_if_expired`, an expired snapshot runs the
    /// completion transition exactly once and its `PhaseCompleted` event is
    /// returned. Otherwise returns `None`.
    pub fn recover(&mut self, trigger_completion_if_expired: bool) -> Result<Option<Event>> {
        let Some(snap) = self.store().timer_snapshot()? else {
            self.stop_ticking();
            self.publish_idle()?;
            debug!("nothing to recover");
            return Ok(None);
        };

        let now = self.now_ms();
        let remaining_ms = snap.remaining_ms(now);
        if remaining_ms == 0 && trigger_completion_if_expired {
            info!(phase = %snap.phase, "phase expired while away; completing");
            return self.complete(snap);
        }

        self.stop_ticking();
        let sessions_this_round = self.store().sessions_this_round()?;
        self.publish(TimerView {
            phase: snap.phase,
            remaining_secs: u64::try_from(remaining_ms / 1000).unwrap_or(0),
            is_running: false,
            sessions_this_round,
        });
        info!(phase = %snap.phase, remaining_ms, "timer restored");
        Ok(None)
    }

    /// The process is being backgrounded. Stops ticking but keeps the
    /// snapshot marked running so the alarm or a later resume can finish it.
    pub fn on_app_pause(&mut self) -> Result<()> {
        if !self.is_ticking() {
            return Ok(());
        }
        self.stop_ticking();
        self.store_mut().set_timer_was_running(true)?;
        debug!("ticking suspended for background");
        Ok(())
    }

    /// The process returned to the foreground.
    pub fn on_app_resume(&mut self) -> Result<Option<Event>> {
        self.recover(true)
    }
}
