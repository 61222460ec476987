use clap::{Subcommand, ValueEnum};
use focustimer_core::{Database, Event, Phase, Store, TimerEngine, TimerService};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a phase from its full configured length
    Start {
        #[arg(value_enum)]
        phase: PhaseArg,
    },
    /// Pause the active phase
    Pause,
    /// Resume a paused phase
    Resume,
    /// Abandon the active phase and return to idle
    Reset,
    /// Print the timer state, completing a phase that already ended
    Status,
    /// Tick in the foreground until the timer stops (Ctrl-C leaves it running)
    Run,
    /// Completion alarm callback for external schedulers
    FireAlarm {
        /// End time (epoch ms) the alarm was scheduled for
        #[arg(long)]
        at: Option<i64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PhaseArg {
    Focus,
    ShortBreak,
    LongBreak,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Focus => Phase::Focus,
            PhaseArg::ShortBreak => Phase::ShortBreak,
            PhaseArg::LongBreak => Phase::LongBreak,
        }
    }
}

/// Timer state as seen from outside the process. `is_running` reflects the
/// persisted snapshot: a phase keeps running between CLI invocations.
#[derive(Serialize)]
struct Status {
    phase: Phase,
    remaining_secs: u64,
    remaining: String,
    is_running: bool,
    sessions_this_round: u32,
    end_time_ms: Option<i64>,
}

fn status(engine: &TimerEngine<Database>) -> Result<Status, Box<dyn std::error::Error>> {
    let view = engine.view();
    let snapshot = engine.timer_snapshot()?;
    Ok(Status {
        phase: view.phase,
        remaining_secs: view.remaining_secs,
        remaining: view.format_remaining(),
        is_running: snapshot.is_some_and(|s| s.was_running),
        sessions_this_round: view.sessions_this_round,
        end_time_ms: snapshot.map(|s| s.end_time_ms),
    })
}

pub fn run(action: TimerAction) -> CliResult {
    let mut engine = open_engine()?;

    let event = match action {
        TimerAction::Start { phase } => engine.start_phase(phase.into())?,
        TimerAction::Pause => engine.pause()?,
        TimerAction::Resume => engine.resume()?,
        TimerAction::Reset => engine.reset()?,
        TimerAction::Status => engine.on_app_resume()?,
        TimerAction::FireAlarm { at } => engine.alarm_fired(at)?,
        TimerAction::Run => return run_foreground(engine),
    };

    match event {
        Some(event) => print_json(&event),
        None => print_json(&status(&engine)?),
    }
}

fn run_foreground(engine: TimerEngine<Database>) -> CliResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let service = TimerService::new(engine);
        let mut events = service.subscribe_events().await;

        service.on_app_resume().await?;
        let was_running = {
            let engine = service.engine();
            let engine = engine.lock().await;
            engine.store().timer_snapshot()?.is_some_and(|s| s.was_running)
        };
        if was_running {
            service.resume().await?;
        }

        if !service.view().is_running {
            // A catch-up completion on resume has already queued its event.
            print_pending(&mut events)?;
            let engine = service.engine();
            let engine = engine.lock().await;
            return print_json(&status(&engine)?);
        }

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => println!("{}", serde_json::to_string(&event)?),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                    Err(RecvError::Closed) => break,
                },
                _ = service.wait_until_stopped() => break,
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    service.on_app_pause().await?;
                    info!("interrupted; phase keeps running in the background");
                    break;
                }
            }
        }
        print_pending(&mut events)
    })
}

fn print_pending(events: &mut broadcast::Receiver<Event>) -> CliResult {
    while let Ok(event) = events.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
