mod engine;
mod phase;
mod recovery;
mod service;


pub use engine::{EngineOptions, TimerEngine, TimerView};
pub use phase::{Phase, TimerSnapshot};
pub use service::TimerService;
