//! Closed-loop control.

pub mod autotune;
pub mod pid;

pub use autotune::{AutoTuneSettings, AutoTuner, TuneFailure, TuneStatus, TunedGains, TuningRule};
pub use pid::{Direction, Mode, PidController};
