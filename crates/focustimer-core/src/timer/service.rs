//! Async driver for [`TimerEngine`].
//!
//! Owns the engine behind a `tokio::sync::Mutex` and runs a one-second
//! ticker task while the engine is ticking. Every command re-syncs the
//! ticker, so it is spawned on start/resume and aborted on pause/reset.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use super::engine::{TimerEngine, TimerView};
use super::phase::Phase;
use crate::error::Result;
use crate::events::Event;
use crate::storage::Store;

pub struct TimerService<S: Store + Send + 'static> {
    engine: Arc<Mutex<TimerEngine<S>>>,
    ticker: StdMutex<Option<JoinHandle<()>>>,
    tick_interval: Duration,
    view: watch::Receiver<TimerView>,
}

impl<S: Store + Send + 'static> TimerService<S> {
    pub fn new(engine: TimerEngine<S>) -> Self {
        let view = engine.subscribe();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            ticker: StdMutex::new(None),
            tick_interval: Duration::from_secs(1),
            view,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Shared handle to the engine for queries the service does not wrap.
    pub fn engine(&self) -> Arc<Mutex<TimerEngine<S>>> {
        self.engine.clone()
    }

    pub fn view(&self) -> TimerView {
        *self.view.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerView> {
        self.view.clone()
    }

    pub async fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.engine.lock().await.subscribe_events()
    }

    pub async fn start_phase(&self, phase: Phase) -> Result<Option<Event>> {
        self.command(|engine| engine.start_phase(phase)).await
    }

    pub async fn pause(&self) -> Result<Option<Event>> {
        self.command(TimerEngine::pause).await
    }

    pub async fn resume(&self) -> Result<Option<Event>> {
        self.command(TimerEngine::resume).await
    }

    pub async fn reset(&self) -> Result<Option<Event>> {
        self.command(TimerEngine::reset).await
    }

    pub async fn alarm_fired(&self, scheduled_for: Option<i64>) -> Result<Option<Event>> {
        self.command(|engine| engine.alarm_fired(scheduled_for)).await
    }

    pub async fn on_app_pause(&self) -> Result<()> {
        self.command(TimerEngine::on_app_pause).await
    }

    pub async fn on_app_resume(&self) -> Result<Option<Event>> {
        self.command(TimerEngine::on_app_resume).await
    }

    /// Wait until the displayed timer is no longer running (completed without
    /// auto-advance, paused or reset).
    pub async fn wait_until_stopped(&self) {
        let mut view = self.view.clone();
        if view.wait_for(|v| !v.is_running).await.is_err() {
            debug!("timer view closed");
        }
    }

    /// Runs `op` and re-syncs the ticker before the engine lock is released,
    /// so a concurrent command cannot act on a stale ticking state.
    async fn command<T>(&self, op: impl FnOnce(&mut TimerEngine<S>) -> Result<T>) -> Result<T> {
        let mut engine = self.engine.lock().await;
        let out = op(&mut engine);
        self.sync_ticker(engine.is_ticking());
        out
    }

    fn sync_ticker(&self, ticking: bool) {
        let mut ticker_guard = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if !ticking {
            if let Some(handle) = ticker_guard.take() {
                handle.abort();
            }
            return;
        }
        if ticker_guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let engine = self.engine.clone();
        let tick_interval = self.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut guard = engine.lock().await;
                if !guard.is_ticking() {
                    break;
                }
                if let Err(e) = guard.tick() {
                    warn!(error = %e, "timer tick failed");
                }
                // Auto-advance leaves the engine ticking into the next phase.
                if !guard.is_ticking() {
                    break;
                }
            }
            debug!("ticker stopped");
        });
        *ticker_guard = Some(handle);
    }

    fn ticker_active(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl<S: Store + Send + 'static> Drop for TimerService<S> {
    fn drop(&mut self) {
        let mut guard = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }
}
