//! # Focustimer Core Library
//!
//! Core logic for a Pomodoro-style focus timer. Front ends (the
//! `focustimer` CLI, or any embedding application) issue commands and
//! render the published view; everything that matters survives process
//! death through the persisted timer snapshot.
//!
//! ## Architecture
//!
//! - **Timer Engine**: wall-clock phase state machine (Idle, Focus, Short
//!   Break, Long Break). The caller invokes `tick()` about once a second;
//!   [`TimerService`] does that on a tokio task.
//! - **Recovery**: rebuilds the view from the persisted snapshot on cold
//!   start and foreground resume, catching up on expired phases.
//! - **Storage**: typed key-value [`Store`] backed by SQLite, plus the TOML
//!   process [`Config`].
//! - **Recommendation**: deterministic rule-based focus and break lengths
//!   from recent history.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Database`]: SQLite-backed store
//! - [`Effects`]: Alarm, notification, DND and feedback capabilities

pub mod clock;
pub mod effects;
pub mod error;
pub mod events;
pub mod recommendation;
pub mod stats;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use effects::{Effects, Recorder};
pub use error::{ConfigError, CoreError, DatabaseError, EffectError};
pub use events::Event;
pub use recommendation::{recommend, FocusProfile, Recommendation};
pub use stats::{DayMinutes, Stats};
pub use storage::{Config, Database, MemoryStore, SessionRecord, Settings, Store};
pub use timer::{EngineOptions, Phase, TimerEngine, TimerService, TimerSnapshot, TimerView};
