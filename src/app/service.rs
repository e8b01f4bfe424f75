//! Control loop service: the hexagonal core.
//!
//! [`ControlLoop`] owns the PID controller, the trip supervisor, the
//! optional profile runner, the optional auto-tuner and the live
//! configuration.  All I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!   InputPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │      ControlLoop        │
//!  OutputPort ◀── │  Trip · Profile · PID   │ ◀─▶ ConfigPort
//!                 └────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{ControllerConfig, PowerOnBehavior};
use crate::control::autotune::{AutoTuner, TuneStatus};
use crate::control::pid::{Mode, PidController, Value};
use crate::error::{Result, SensorError};
use crate::profile::ProfileRunner;
use crate::safety::{TripSupervisor, TripTransition};

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{ConfigPort, EventSink, InputPort, OutputPort};

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

/// The control loop orchestrates all domain logic.
pub struct ControlLoop {
    config: ControllerConfig,
    pid: PidController,
    trip: TripSupervisor,
    profile: Option<ProfileRunner>,
    /// While set, the tuner drives the output instead of the PID.
    autotune: Option<AutoTuner>,
    /// Last good process value.
    input: Value,
    /// `None` until the first read.
    input_ok: Option<bool>,
    /// Output most recently written to the output port.
    output: Value,
    last_telemetry_ms: Option<u32>,
    tick_count: u64,
}

impl ControlLoop {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch the ports; call [`start`](Self::start) next.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        let mut pid = PidController::new(config.kp, config.ki, config.kd, config.direction)?;
        pid.set_sample_time(config.sample_time_ms)?;
        pid.set_output_limits(config.output_min, config.output_max)?;
        pid.set_setpoint(config.setpoint);
        pid.set_output(config.manual_output);
        let trip =
            TripSupervisor::new(config.trip_lower, config.trip_upper, config.trip_auto_reset)?;

        Ok(Self {
            config,
            pid,
            trip,
            profile: None,
            autotune: None,
            input: Value::ZERO,
            input_ok: None,
            output: Value::ZERO,
            last_telemetry_ms: None,
            tick_count: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Configure the output device, take a first reading and apply the
    /// power-on behaviour.
    pub fn start(
        &mut self,
        now_ms: u32,
        io: &mut (impl InputPort + OutputPort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        io.set_output_window(self.config.output_window_seconds)?;
        self.read_input(now_ms, io, sink);

        let mode = match self.config.power_on {
            PowerOnBehavior::Disable => Mode::Manual,
            PowerOnBehavior::ContinueLoop => self.config.mode,
        };
        self.pid.set_mode(mode, self.input);
        sink.emit(&AppEvent::Started(mode));
        info!(
            "ControlLoop started: {:?}, input {} via '{}', output via '{}'",
            mode,
            self.input,
            InputPort::identifier(&*io),
            OutputPort::identifier(&*io),
        );
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: read input → trip → profile → PID (or
    /// auto-tune) → output.
    ///
    /// Call this much more often than the PID sample time: the output port
    /// is driven every tick so a time-proportioning SSR switches on time.
    /// The `io` parameter satisfies **both** [`InputPort`] and
    /// [`OutputPort`], which avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u32,
        io: &mut (impl InputPort + OutputPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        // 1. Read the process value via InputPort
        self.read_input(now_ms, io, sink);

        // 2. Trip evaluation
        if self.has_input() {
            match self.trip.evaluate(self.input) {
                TripTransition::Tripped(cause) => {
                    sink.emit(&AppEvent::Tripped(cause));
                    if self.autotune.is_some() {
                        warn!("Trip during auto-tune, cancelling");
                        self.end_autotune();
                        sink.emit(&AppEvent::AutoTuneCancelled);
                    }
                }
                TripTransition::Cleared => sink.emit(&AppEvent::TripCleared),
                TripTransition::Unchanged => {}
            }
        }

        // 3. Profile → setpoint
        if let Some(runner) = self.profile.as_mut() {
            let step = runner.update(now_ms, self.input);
            self.pid.set_setpoint(step.setpoint);
            if step.advanced {
                sink.emit(&AppEvent::ProfileAdvanced {
                    step: step.step,
                    buzzer: step.buzzer,
                });
            }
            if step.finished {
                self.profile = None;
                sink.emit(&AppEvent::ProfileEnded { completed: true });
            }
        }

        // 4. PID, or the auto-tuner in its place
        if self.has_input() {
            if self.autotune.is_some() {
                self.run_autotune(now_ms, sink);
            } else {
                self.pid.compute(now_ms, self.input);
            }
        }

        // 5. Drive the output port
        self.output = self.effective_output();
        if let Err(e) = io.set_output_percent(self.output, now_ms) {
            warn!("Output write failed: {e}");
            sink.emit(&AppEvent::OutputFault(e));
        }

        // 6. Telemetry, once per sample period
        let due = self.last_telemetry_ms.is_none_or(|last| {
            now_ms.wrapping_sub(last) >= u32::from(self.config.sample_time_ms)
        });
        if due {
            self.last_telemetry_ms = Some(now_ms);
            sink.emit(&AppEvent::Telemetry(self.telemetry()));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (front panel, serial host, etc.).
    ///
    /// Commands that change configuration validate the resulting config
    /// first; a rejected command leaves the controller untouched.
    pub fn handle_command(
        &mut self,
        now_ms: u32,
        cmd: AppCommand,
        io: &mut impl OutputPort,
        store: &impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            AppCommand::SetSetpoint(setpoint) => {
                self.config = self.candidate(|c| c.setpoint = setpoint)?;
                self.pid.set_setpoint(setpoint);
                if self.profile.is_some() {
                    info!("Setpoint {setpoint} will be overridden by the running profile");
                }
            }
            AppCommand::SetTunings { kp, ki, kd } => {
                let next = self.candidate(|c| {
                    c.kp = kp;
                    c.ki = ki;
                    c.kd = kd;
                })?;
                self.pid.set_tunings(kp, ki, kd)?;
                self.config = next;
                sink.emit(&AppEvent::TuningsChanged { kp, ki, kd });
            }
            AppCommand::SetDirection(direction) => {
                self.config = self.candidate(|c| c.direction = direction)?;
                self.pid.set_direction(direction);
            }
            AppCommand::SetMode(mode) => {
                self.config = self.candidate(|c| c.mode = mode)?;
                let from = self.pid.mode();
                self.pid.set_mode(mode, self.input);
                if from != mode {
                    info!("Mode {from:?} -> {mode:?}");
                    sink.emit(&AppEvent::ModeChanged { from, to: mode });
                }
            }
            AppCommand::SetManualOutput(value) => {
                if self.pid.set_output(value) {
                    let applied = self.pid.output();
                    self.config = self.candidate(|c| c.manual_output = applied)?;
                } else {
                    warn!("Manual output {value} ignored in automatic mode");
                }
            }
            AppCommand::SetOutputLimits { min, max } => {
                let next = self.candidate(|c| {
                    c.output_min = min;
                    c.output_max = max;
                    if min < max {
                        c.manual_output = c.manual_output.clamp(min, max);
                    }
                })?;
                self.pid.set_output_limits(min, max)?;
                self.config = next;
            }
            AppCommand::SetSampleTime(ms) => {
                let next = self.candidate(|c| c.sample_time_ms = ms)?;
                self.pid.set_sample_time(ms)?;
                self.config = next;
            }
            AppCommand::SetOutputWindow(seconds) => {
                let next = self.candidate(|c| c.output_window_seconds = seconds)?;
                io.set_output_window(seconds)?;
                self.config = next;
            }
            AppCommand::SetTripLimits {
                lower,
                upper,
                auto_reset,
            } => {
                let next = self.candidate(|c| {
                    c.trip_lower = lower;
                    c.trip_upper = upper;
                    c.trip_auto_reset = auto_reset;
                })?;
                self.trip.set_limits(lower, upper)?;
                self.trip.set_auto_reset(auto_reset);
                self.config = next;
            }
            AppCommand::ResetTrip => {
                if self.trip.is_tripped() {
                    self.trip.reset();
                    sink.emit(&AppEvent::TripCleared);
                }
            }
            AppCommand::StartProfile(profile) => {
                let runner = ProfileRunner::start(profile, now_ms, self.pid.setpoint())?;
                if self.profile.replace(runner).is_some() {
                    info!("Running profile replaced");
                }
            }
            AppCommand::StopProfile => {
                if self.profile.take().is_some() {
                    self.pid.set_setpoint(self.config.setpoint);
                    info!("Profile cancelled, setpoint back to {}", self.config.setpoint);
                    sink.emit(&AppEvent::ProfileEnded { completed: false });
                }
            }
            AppCommand::StartAutoTune(settings) => {
                if !self.has_input() {
                    return Err(SensorError::ReadFailed.into());
                }
                // A restart keeps the output the first run started from.
                let output = self
                    .autotune
                    .as_ref()
                    .map_or(self.pid.output(), AutoTuner::output_start);
                let (min, max) = self.pid.output_limits();
                let tuner = AutoTuner::start(settings, now_ms, self.input, output, min, max)?;
                if self.autotune.replace(tuner).is_some() {
                    info!("Running auto-tune restarted");
                }
                sink.emit(&AppEvent::AutoTuneStarted);
            }
            AppCommand::StopAutoTune => {
                if self.autotune.is_some() {
                    self.end_autotune();
                    info!("Auto-tune cancelled");
                    sink.emit(&AppEvent::AutoTuneCancelled);
                }
            }
            AppCommand::SaveConfig => {
                store.save(&self.config)?;
                info!("Configuration saved");
                sink.emit(&AppEvent::ConfigSaved);
            }
            AppCommand::LoadConfig => {
                let config = store.load()?;
                self.apply_config(config, io)?;
                info!("Configuration loaded");
                sink.emit(&AppEvent::ConfigLoaded);
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current state.
    pub fn telemetry(&self) -> TelemetryData {
        TelemetryData {
            mode: self.pid.mode(),
            setpoint: self.pid.setpoint(),
            input: self.input,
            output: self.output,
            tripped: self.trip.is_tripped(),
            profile_step: self.profile.as_ref().map(ProfileRunner::current_step),
            tuning: self.autotune.is_some(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.pid.mode()
    }

    /// Setpoint in effect, including a running profile's.
    pub fn setpoint(&self) -> Value {
        self.pid.setpoint()
    }

    pub fn input(&self) -> Value {
        self.input
    }

    /// Output most recently applied to the output port.
    pub fn output(&self) -> Value {
        self.output
    }

    pub fn is_tripped(&self) -> bool {
        self.trip.is_tripped()
    }

    pub fn profile(&self) -> Option<&ProfileRunner> {
        self.profile.as_ref()
    }

    pub fn autotune(&self) -> Option<&AutoTuner> {
        self.autotune.as_ref()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn read_input(&mut self, now_ms: u32, io: &mut impl InputPort, sink: &mut impl EventSink) {
        match io.read_input(now_ms) {
            Ok(value) => {
                if !self.has_input() {
                    info!("Input '{}' reading {value}", io.identifier());
                }
                self.input = value;
                self.input_ok = Some(true);
            }
            Err(e) => {
                if self.input_ok != Some(false) {
                    warn!("Input '{}' failed: {e}", io.identifier());
                    sink.emit(&AppEvent::InputFault(e));
                }
                self.input_ok = Some(false);
            }
        }
    }

    fn has_input(&self) -> bool {
        self.input_ok == Some(true)
    }

    /// Tripped, or automatic or tuning without a valid input: zero.
    /// Otherwise the auto-tuner's relay output, or the PID output
    /// (computed or manual).
    fn effective_output(&self) -> Value {
        let closed_loop = self.pid.mode() == Mode::Automatic || self.autotune.is_some();
        let blind = !self.has_input() && closed_loop;
        if self.trip.is_tripped() || blind {
            Value::ZERO
        } else if let Some(tuner) = &self.autotune {
            tuner.output()
        } else {
            self.pid.output()
        }
    }

    fn run_autotune(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        let Some(tuner) = self.autotune.as_mut() else {
            return;
        };
        match tuner.update(now_ms, self.input) {
            TuneStatus::Running(_) => {}
            TuneStatus::Converged(gains) => {
                self.end_autotune();
                let (kp, ki, kd) = (gains.kp, gains.ki, gains.kd);
                let applied = self
                    .candidate(|c| {
                        c.kp = kp;
                        c.ki = ki;
                        c.kd = kd;
                    })
                    .and_then(|next| {
                        self.pid.set_tunings(kp, ki, kd)?;
                        Ok(next)
                    });
                match applied {
                    Ok(next) => {
                        self.config = next;
                        sink.emit(&AppEvent::AutoTuneConverged(gains));
                        sink.emit(&AppEvent::TuningsChanged { kp, ki, kd });
                    }
                    Err(e) => warn!("Auto-tune gains rejected: {e}"),
                }
            }
            TuneStatus::Failed(cause) => {
                self.end_autotune();
                sink.emit(&AppEvent::AutoTuneFailed(cause));
            }
        }
    }

    /// Drop the tuner and hand the output back to the PID at the value
    /// the run started from.
    fn end_autotune(&mut self) {
        let Some(tuner) = self.autotune.take() else {
            return;
        };
        let mode = self.pid.mode();
        // Re-entering automatic from the restored output is bumpless.
        self.pid.set_mode(Mode::Manual, self.input);
        self.pid.set_output(tuner.output_start());
        self.pid.set_mode(mode, self.input);
    }

    /// A validated copy of the live config with `change` applied.
    fn candidate(&self, change: impl FnOnce(&mut ControllerConfig)) -> Result<ControllerConfig> {
        let mut next = self.config.clone();
        change(&mut next);
        next.validate()?;
        Ok(next)
    }

    fn apply_config(&mut self, config: ControllerConfig, io: &mut impl OutputPort) -> Result<()> {
        config.validate()?;
        io.set_output_window(config.output_window_seconds)?;
        self.pid.set_tunings(config.kp, config.ki, config.kd)?;
        self.pid.set_direction(config.direction);
        self.pid.set_sample_time(config.sample_time_ms)?;
        self.pid.set_output_limits(config.output_min, config.output_max)?;
        if self.profile.is_none() {
            self.pid.set_setpoint(config.setpoint);
        }
        self.trip.set_limits(config.trip_lower, config.trip_upper)?;
        self.trip.set_auto_reset(config.trip_auto_reset);
        self.pid.set_mode(config.mode, self.input);
        self.pid.set_output(config.manual_output);
        self.config = config;
        Ok(())
    }
}
