//! Unified error types for the osPID firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the control
//! loop and command handler report failures uniformly.  All variants are
//! `Copy` and allocation-free.

use core::fmt;

use crate::app::ports::ConfigError;
use crate::decimal::NumericError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A checked fixed-point operation failed.
    Numeric(NumericError),
    /// The input device could not be read.
    Sensor(SensorError),
    /// The output device rejected a command.
    Actuator(ActuatorError),
    /// PID tuning parameters were rejected.
    Tuning(TuningError),
    /// A setpoint profile could not be built or started.
    Profile(ProfileError),
    /// Configuration is invalid or could not be loaded/saved.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(e) => write!(f, "numeric: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Tuning(e) => write!(f, "tuning: {e}"),
            Self::Profile(e) => write!(f, "profile: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<NumericError> for Error {
    fn from(e: NumericError) -> Self {
        Self::Numeric(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The device did not answer or returned garbage.
    ReadFailed,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "input read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Output window below the 1.0 s minimum.
    WindowTooShort,
    /// GPIO write to the output pin failed.
    PinWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowTooShort => write!(f, "output window shorter than 1.0 s"),
            Self::PinWriteFailed => write!(f, "output pin write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Tuning errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningError {
    /// Kp, Ki or Kd was negative.  Use `Direction::Reverse` instead.
    NegativeGain,
    /// Sample time of zero milliseconds.
    ZeroSampleTime,
    /// Output minimum not strictly below the maximum.
    InvalidOutputLimits,
    /// Auto-tune output step not positive, or negative noise band.
    InvalidAutoTuneSettings,
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeGain => write!(f, "gains must not be negative"),
            Self::ZeroSampleTime => write!(f, "sample time must be at least 1 ms"),
            Self::InvalidOutputLimits => write!(f, "output minimum must be below maximum"),
            Self::InvalidAutoTuneSettings => {
                write!(f, "auto-tune step must be positive and noise band not negative")
            }
        }
    }
}

impl From<TuningError> for Error {
    fn from(e: TuningError) -> Self {
        Self::Tuning(e)
    }
}

// ---------------------------------------------------------------------------
// Profile errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// All step slots are used.
    Full,
    /// Profile name longer than the stored name field.
    NameTooLong,
    /// A profile without steps cannot be run.
    Empty,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "profile has no free step slots"),
            Self::NameTooLong => write!(f, "profile name too long"),
            Self::Empty => write!(f, "profile has no steps"),
        }
    }
}

impl From<ProfileError> for Error {
    fn from(e: ProfileError) -> Self {
        Self::Profile(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
