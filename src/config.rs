//! Controller configuration parameters
//!
//! All tunable parameters of the osPID loop.  Persisted through
//! [`ConfigPort`](crate::app::ports::ConfigPort) as a postcard blob, in
//! which every decimal is a fixed two-byte field.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::control::pid::{self, Direction, Gain, Mode, Value};
use crate::drivers::ssr;

/// What the controller does after a reset or power loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerOnBehavior {
    /// Start in `Manual` mode at the stored manual output.
    Disable,
    /// Resume in the stored mode.
    ContinueLoop,
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Loop ---
    pub setpoint: Value,
    /// Proportional gain (% per unit of error)
    pub kp: Gain,
    /// Integral gain (per second)
    pub ki: Gain,
    /// Derivative gain (seconds)
    pub kd: Gain,
    pub direction: Direction,
    /// PID sample period (milliseconds)
    pub sample_time_ms: u16,
    /// Output limits (percent)
    pub output_min: Value,
    pub output_max: Value,

    // --- Output device ---
    /// SSR time-proportioning window (seconds)
    pub output_window_seconds: Value,

    // --- Trip ---
    pub trip_lower: Option<Value>,
    pub trip_upper: Option<Value>,
    pub trip_auto_reset: bool,

    // --- Power-on ---
    pub mode: Mode,
    pub power_on: PowerOnBehavior,
    /// Output applied in `Manual` mode (percent)
    pub manual_output: Value,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Loop
            setpoint: Value::from_raw(250), // 25.0
            kp: Gain::from_raw(2000),       // 2.000
            ki: Gain::from_raw(500),        // 0.500
            kd: Gain::from_raw(100),        // 0.100
            direction: Direction::Direct,
            sample_time_ms: pid::DEFAULT_SAMPLE_TIME_MS,
            output_min: pid::DEFAULT_OUTPUT_MIN,
            output_max: pid::DEFAULT_OUTPUT_MAX,

            // Output device
            output_window_seconds: ssr::DEFAULT_WINDOW,

            // Trip
            trip_lower: None,
            trip_upper: None,
            trip_auto_reset: false,

            // Power-on
            mode: Mode::Manual,
            power_on: PowerOnBehavior::ContinueLoop,
            manual_output: Value::ZERO,
        }
    }
}

impl ControllerConfig {
    /// Range-check every field.  Called before persisting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kp.is_negative() || self.ki.is_negative() || self.kd.is_negative() {
            return Err(ConfigError::ValidationFailed("gains must not be negative"));
        }
        if self.sample_time_ms == 0 {
            return Err(ConfigError::ValidationFailed("sample_time_ms must be at least 1"));
        }
        let full_scale = pid::DEFAULT_OUTPUT_MAX;
        if self.output_min < Value::ZERO || self.output_max > full_scale {
            return Err(ConfigError::ValidationFailed("output limits must be 0.0–100.0"));
        }
        if self.output_min >= self.output_max {
            return Err(ConfigError::ValidationFailed(
                "output_min must be < output_max",
            ));
        }
        if self.output_window_seconds < ssr::MIN_WINDOW {
            return Err(ConfigError::ValidationFailed(
                "output_window_seconds must be at least 1.0",
            ));
        }
        if let (Some(lo), Some(hi)) = (self.trip_lower, self.trip_upper) {
            if lo >= hi {
                return Err(ConfigError::ValidationFailed(
                    "trip_lower must be < trip_upper",
                ));
            }
        }
        if self.manual_output < self.output_min || self.manual_output > self.output_max {
            return Err(ConfigError::ValidationFailed(
                "manual_output must lie within the output limits",
            ));
        }
        Ok(())
    }
}
