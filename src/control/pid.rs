//! PID controller for the process value.
//!
//! Fixed-point implementation of the classic "derivative on measurement"
//! loop.  Gains are kept in the form the operator enters them
//! (`FixedDecimal<3>`, per second); the per-sample scaling by the sample
//! period happens inside [`compute`](PidController::compute).
//!
//! All intermediates live in `WideDecimal<4>`: `Kp · e` of a 3-digit gain
//! and a 1-digit error is exact there, and sums saturate instead of
//! wrapping.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::decimal::{FixedDecimal, NumericError, NumericResult, WideDecimal};
use crate::error::TuningError;

/// Process value, setpoint and output resolution.
pub type Value = FixedDecimal<1>;
/// Gain resolution.
pub type Gain = FixedDecimal<3>;

type Acc = WideDecimal<4>;

pub const DEFAULT_SAMPLE_TIME_MS: u16 = 1000;
pub const DEFAULT_OUTPUT_MIN: Value = Value::from_raw(0);
pub const DEFAULT_OUTPUT_MAX: Value = Value::from_raw(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Output is set by the operator; `compute` does nothing.
    Manual,
    /// Output is computed every sample period.
    Automatic,
}

/// Sign of the process response to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// More output raises the process value (heating).
    Direct,
    /// More output lowers the process value (cooling).
    Reverse,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    kp: Gain,
    ki: Gain,
    kd: Gain,
    direction: Direction,
    mode: Mode,
    sample_time_ms: u16,
    setpoint: Value,
    output: Value,
    output_min: Value,
    output_max: Value,
    integral: Acc,
    last_input: Value,
    last_time_ms: Option<u32>,
}

impl PidController {
    /// Create a controller in `Manual` mode with 0–100 output limits.
    pub fn new(kp: Gain, ki: Gain, kd: Gain, direction: Direction) -> Result<Self, TuningError> {
        let mut pid = Self {
            kp: Gain::ZERO,
            ki: Gain::ZERO,
            kd: Gain::ZERO,
            direction,
            mode: Mode::Manual,
            sample_time_ms: DEFAULT_SAMPLE_TIME_MS,
            setpoint: Value::ZERO,
            output: Value::ZERO,
            output_min: DEFAULT_OUTPUT_MIN,
            output_max: DEFAULT_OUTPUT_MAX,
            integral: Acc::ZERO,
            last_input: Value::ZERO,
            last_time_ms: None,
        };
        pid.set_tunings(kp, ki, kd)?;
        Ok(pid)
    }

    // ── Tuning ────────────────────────────────────────────────

    /// Replace the gains.  Rejected as a whole if any gain is negative.
    pub fn set_tunings(&mut self, kp: Gain, ki: Gain, kd: Gain) -> Result<(), TuningError> {
        if kp.is_negative() || ki.is_negative() || kd.is_negative() {
            return Err(TuningError::NegativeGain);
        }
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        debug!("PID tunings kp={kp} ki={ki} kd={kd}");
        Ok(())
    }

    /// `(Kp, Ki, Kd)` as entered.
    pub fn tunings(&self) -> (Gain, Gain, Gain) {
        (self.kp, self.ki, self.kd)
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_sample_time(&mut self, ms: u16) -> Result<(), TuningError> {
        if ms == 0 {
            return Err(TuningError::ZeroSampleTime);
        }
        self.sample_time_ms = ms;
        Ok(())
    }

    pub fn sample_time_ms(&self) -> u16 {
        self.sample_time_ms
    }

    /// Set output limits.  The current output is pulled inside the new
    /// band immediately in either mode; in `Automatic` mode the integral
    /// term is too.
    pub fn set_output_limits(&mut self, min: Value, max: Value) -> Result<(), TuningError> {
        if min >= max {
            return Err(TuningError::InvalidOutputLimits);
        }
        self.output_min = min;
        self.output_max = max;
        self.output = self.output.clamp(min, max);
        if self.mode == Mode::Automatic {
            self.integral = self.limit(self.integral);
        }
        Ok(())
    }

    pub fn output_limits(&self) -> (Value, Value) {
        (self.output_min, self.output_max)
    }

    // ── Setpoint / mode / output ──────────────────────────────

    /// Update setpoint
    pub fn set_setpoint(&mut self, setpoint: Value) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> Value {
        self.setpoint
    }

    /// Switch mode.  Going from `Manual` to `Automatic` seeds the integral
    /// with the current output and the derivative history with `input`, so
    /// the output does not jump.
    pub fn set_mode(&mut self, mode: Mode, input: Value) {
        if self.mode == Mode::Manual && mode == Mode::Automatic {
            self.initialize(input);
            info!("PID automatic, bumpless from output {}", self.output);
        }
        self.mode = mode;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Set the output directly.  Only honoured in `Manual` mode; returns
    /// whether the value was applied.  The value is held to the output limits.
    pub fn set_output(&mut self, value: Value) -> bool {
        if self.mode != Mode::Manual {
            return false;
        }
        self.output = value.clamp(self.output_min, self.output_max);
        true
    }

    pub fn output(&self) -> Value {
        self.output
    }

    // ── Computation ───────────────────────────────────────────

    /// Run one PID step if a full sample period has elapsed since the last
    /// one.  Returns the new output when a step ran.
    ///
    /// `now_ms` is a wrapping millisecond clock.  The first call after
    /// construction always computes.
    pub fn compute(&mut self, now_ms: u32, input: Value) -> Option<Value> {
        if self.mode == Mode::Manual {
            return None;
        }
        if let Some(last) = self.last_time_ms {
            if now_ms.wrapping_sub(last) < u32::from(self.sample_time_ms) {
                return None;
            }
        }

        let mut error = self.setpoint.saturating_sub(input);
        let mut d_input = input.saturating_sub(self.last_input);
        if self.direction == Direction::Reverse {
            error = Value::ZERO.saturating_sub(error);
            d_input = Value::ZERO.saturating_sub(d_input);
        }

        let dt_ms = i32::from(self.sample_time_ms);
        let i_step = saturate((self.ki * error).checked_mul_ratio(dt_ms, 1000));
        self.integral = self.limit(self.integral.saturating_add(i_step));

        let p_term: Acc = self.kp * error;
        let d_term = saturate((self.kd * d_input).checked_mul_ratio(1000, dt_ms));

        let out = self.limit(p_term.saturating_add(self.integral).saturating_sub(d_term));
        self.output = out.rescale::<1>();

        self.last_input = input;
        self.last_time_ms = Some(now_ms);
        Some(self.output)
    }

    fn initialize(&mut self, input: Value) {
        self.integral = self.limit(self.output.widen().rescale_wide::<4>());
        self.last_input = input;
    }

    fn limit(&self, value: Acc) -> Acc {
        let min = self.output_min.widen().rescale_wide::<4>();
        let max = self.output_max.widen().rescale_wide::<4>();
        value.clamp(min, max)
    }
}

/// Clamp an out-of-range checked result to the accumulator bounds.
fn saturate(result: NumericResult<Acc>) -> Acc {
    match result {
        Ok(v) => v,
        Err(NumericError::Underflow) => Acc::MIN,
        Err(_) => Acc::MAX,
    }
}
