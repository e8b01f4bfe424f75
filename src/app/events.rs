//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, draw on the LCD,
//! forward to a host.

use crate::control::autotune::{TuneFailure, TunedGains};
use crate::control::pid::{Gain, Mode};
use crate::decimal::FixedDecimal;
use crate::error::{ActuatorError, SensorError};
use crate::safety::TripCause;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Periodic telemetry snapshot, once per PID sample.
    Telemetry(TelemetryData),

    /// The controller has started (carries the initial mode).
    Started(Mode),

    /// The PID switched between manual and automatic.
    ModeChanged { from: Mode, to: Mode },

    /// New gains were accepted.
    TuningsChanged { kp: Gain, ki: Gain, kd: Gain },

    /// The process value left the trip band; output forced to zero.
    Tripped(TripCause),

    /// The trip cleared (auto-reset or manual).
    TripCleared,

    /// One or more profile steps completed.  `step` is the step now
    /// active, or the last step once the profile has finished.
    ProfileAdvanced { step: usize, buzzer: bool },

    /// The running profile completed or was cancelled.
    ProfileEnded { completed: bool },

    /// The relay auto-tuner took over the output.
    AutoTuneStarted,

    /// Auto-tune finished and its gains are live.
    AutoTuneConverged(TunedGains),

    /// Auto-tune gave up; the tunings are unchanged.
    AutoTuneFailed(TuneFailure),

    /// Auto-tune was stopped by command or by a trip.
    AutoTuneCancelled,

    /// The input device could not be read; output forced to zero.
    InputFault(SensorError),

    /// The output device rejected a write.
    OutputFault(ActuatorError),

    /// Configuration was persisted / restored.
    ConfigSaved,
    ConfigLoaded,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub mode: Mode,
    pub setpoint: FixedDecimal<1>,
    pub input: FixedDecimal<1>,
    pub output: FixedDecimal<1>,
    pub tripped: bool,
    /// Active profile step, if a profile is running.
    pub profile_step: Option<usize>,
    /// The auto-tuner is driving the output.
    pub tuning: bool,
}
