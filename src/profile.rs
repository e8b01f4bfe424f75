//! Setpoint profiles.
//!
//! A [`Profile`] is a short, fixed-capacity program of setpoint steps
//! (ramp, soak, jump, wait, hold).  A [`ProfileRunner`] executes one
//! against a millisecond clock and hands the control loop the setpoint
//! to use on each tick.

use heapless::{String, Vec};
use log::info;
use serde::{Deserialize, Serialize};

use crate::decimal::FixedDecimal;
use crate::error::ProfileError;

type Value = FixedDecimal<1>;

pub const MAX_STEPS: usize = 16;
pub const NAME_LENGTH: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// Move the setpoint linearly to the endpoint over the duration.
    RampToSetpoint,
    /// Hold the setpoint at the endpoint for the duration.
    SoakAtValue,
    /// Set the setpoint to the endpoint and continue at once.
    JumpToSetpoint,
    /// Keep the setpoint until the process value crosses the endpoint.
    WaitToCross,
    /// Hold the setpoint at the endpoint until the profile is cancelled.
    HoldUntilCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStep {
    pub kind: StepKind,
    /// Step length for ramp and soak steps.  Ignored by the others.
    pub duration_ms: u32,
    pub endpoint: Value,
    /// Sound the buzzer when the step completes.
    pub buzzer: bool,
}

impl ProfileStep {
    pub const fn new(kind: StepKind, duration_ms: u32, endpoint: Value) -> Self {
        Self {
            kind,
            duration_ms,
            endpoint,
            buzzer: false,
        }
    }

    #[must_use]
    pub const fn with_buzzer(mut self) -> Self {
        self.buzzer = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    name: String<NAME_LENGTH>,
    steps: Vec<ProfileStep, MAX_STEPS>,
}

impl Profile {
    pub fn new(name: &str) -> Result<Self, ProfileError> {
        let name = String::try_from(name).map_err(|()| ProfileError::NameTooLong)?;
        Ok(Self {
            name,
            steps: Vec::new(),
        })
    }

    pub fn add_step(&mut self, step: ProfileStep) -> Result<(), ProfileError> {
        self.steps.push(step).map_err(|_| ProfileError::Full)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[ProfileStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

// ───────────────────────────────────────────────────────────────
// Runner
// ───────────────────────────────────────────────────────────────

/// What happened during one [`ProfileRunner::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileTick {
    /// Setpoint the loop should use now.
    pub setpoint: Value,
    /// Index of the active step (or the last step once finished).
    pub step: usize,
    /// At least one step completed during this update.
    pub advanced: bool,
    /// A completed step asked for the buzzer.
    pub buzzer: bool,
    /// The last step completed.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct ProfileRunner {
    profile: Profile,
    index: usize,
    step_started_ms: u32,
    step_start_setpoint: Value,
    setpoint: Value,
    /// Side of the endpoint the process value started on, for `WaitToCross`.
    started_below: Option<bool>,
    finished: bool,
}

impl ProfileRunner {
    /// Begin running `profile` from the current setpoint.
    pub fn start(profile: Profile, now_ms: u32, setpoint: Value) -> Result<Self, ProfileError> {
        if profile.is_empty() {
            return Err(ProfileError::Empty);
        }
        info!("PROFILE | start '{}' ({} steps)", profile.name(), profile.len());
        Ok(Self {
            profile,
            index: 0,
            step_started_ms: now_ms,
            step_start_setpoint: setpoint,
            setpoint,
            started_below: None,
            finished: false,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn current_step(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance to time `now_ms` with process value `input`.
    ///
    /// Several instantaneous steps (jumps, already-crossed waits) can
    /// complete in one update.
    pub fn update(&mut self, now_ms: u32, input: Value) -> ProfileTick {
        let mut tick = ProfileTick {
            setpoint: self.setpoint,
            step: self.index,
            advanced: false,
            buzzer: false,
            finished: self.finished,
        };
        if self.finished {
            return tick;
        }

        while let Some(&step) = self.profile.steps.get(self.index) {
            if !self.run_step(step, now_ms, input) {
                break;
            }
            tick.advanced = true;
            tick.buzzer |= step.buzzer;
            info!("PROFILE | step {} done, setpoint={}", self.index, self.setpoint);

            if self.index + 1 == self.profile.len() {
                self.finished = true;
                info!("PROFILE | '{}' finished", self.profile.name());
                break;
            }
            self.index += 1;
            self.step_started_ms = now_ms;
            self.step_start_setpoint = self.setpoint;
            self.started_below = None;
        }

        tick.setpoint = self.setpoint;
        tick.step = self.index;
        tick.finished = self.finished;
        tick
    }

    /// Apply `step` at `now_ms`; returns whether it completed.
    fn run_step(&mut self, step: ProfileStep, now_ms: u32, input: Value) -> bool {
        let elapsed = now_ms.wrapping_sub(self.step_started_ms);
        match step.kind {
            StepKind::RampToSetpoint => {
                if elapsed >= step.duration_ms {
                    self.setpoint = step.endpoint;
                    return true;
                }
                self.setpoint = interpolate(
                    self.step_start_setpoint,
                    step.endpoint,
                    elapsed,
                    step.duration_ms,
                );
                false
            }
            StepKind::SoakAtValue => {
                self.setpoint = step.endpoint;
                elapsed >= step.duration_ms
            }
            StepKind::JumpToSetpoint => {
                self.setpoint = step.endpoint;
                true
            }
            StepKind::WaitToCross => {
                let below = input < step.endpoint;
                let started_below = *self.started_below.get_or_insert(below);
                input == step.endpoint || below != started_below
            }
            StepKind::HoldUntilCancel => {
                self.setpoint = step.endpoint;
                false
            }
        }
    }
}

/// Linear interpolation truncated toward zero.  `elapsed < duration`.
fn interpolate(from: Value, to: Value, elapsed: u32, duration: u32) -> Value {
    let span = i64::from(to.raw_value()) - i64::from(from.raw_value());
    let offset = span * i64::from(elapsed) / i64::from(duration);
    Value::from_raw((i64::from(from.raw_value()) + offset) as i16)
}
