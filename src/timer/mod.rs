pub mod controller;
pub mod state;

pub use controller::{SessionResult, TimerController, TimerSnapshot};
pub use state::{TimerMode, TimerState, TimerStatus};
