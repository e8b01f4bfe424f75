//! Inbound commands to the control loop.
//!
//! These represent actions requested by the outside world (front-panel
//! keys, serial host link) that the
//! [`ControlLoop`](super::service::ControlLoop) interprets and acts upon.

use crate::control::autotune::AutoTuneSettings;
use crate::control::pid::{Direction, Gain, Mode, Value};
use crate::profile::Profile;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    SetSetpoint(Value),

    SetTunings { kp: Gain, ki: Gain, kd: Gain },

    SetDirection(Direction),

    /// Switch manual/automatic.  Manual → automatic is bumpless.
    SetMode(Mode),

    /// Output in percent; only honoured in manual mode.
    SetManualOutput(Value),

    SetOutputLimits { min: Value, max: Value },

    SetSampleTime(u16),

    /// SSR window length in seconds (minimum 1.0).
    SetOutputWindow(Value),

    SetTripLimits {
        lower: Option<Value>,
        upper: Option<Value>,
        auto_reset: bool,
    },

    /// Clear a latched trip.
    ResetTrip,

    StartProfile(Profile),

    StopProfile,

    /// Hand the output to the relay auto-tuner.  Converged gains replace
    /// the live tunings.
    StartAutoTune(AutoTuneSettings),

    /// Abandon a running auto-tune and restore the output.
    StopAutoTune,

    /// Persist the live configuration through the config port.
    SaveConfig,

    /// Replace the live configuration with the stored one.
    LoadConfig,
}
