//! Simulated process, for bench testing without a heater.
//!
//! First-order-plus-dead-time plant:
//!
//! ```text
//! pv[n+1] = pv[n] + (gain · (u[n - d] - u0) - (pv[n] - pv0)) / lag
//! ```
//!
//! with process gain `gain`, lag `lag` (in model updates), dead time `d`
//! (in model updates) and the operating point `u0 = 50 %`,
//! `pv0 = 100.0`.  The model steps once per `period_ms` of the clock
//! passed to [`InputPort::read_input`].  It implements both ports, so a
//! single value can stand in for the whole I/O card.

use heapless::Deque;
use log::debug;

use crate::app::ports::{ConfigError, InputPort, OutputPort};
use crate::decimal::{FixedDecimal, WideDecimal};
use crate::error::{ActuatorError, Error, Result, SensorError};

/// Longest supported dead time, in model updates.
pub const MAX_DEAD_TIME: usize = 16;

/// Model updates applied at most per read, after a long clock gap.
const MAX_CATCH_UP: u32 = 100;

const OUTPUT_START: FixedDecimal<1> = FixedDecimal::from_raw(500);
const PV_START: FixedDecimal<1> = FixedDecimal::from_raw(1000);

pub const IDENTIFIER: &str = "Simulator";

pub struct ProcessSimulator {
    gain: FixedDecimal<2>,
    lag: FixedDecimal<0>,
    period_ms: u32,
    /// `pv - pv0`, kept at three decimals so small steps accumulate.
    deviation: WideDecimal<3>,
    /// Applied outputs waiting out the dead time; the back is the newest.
    pipeline: Deque<FixedDecimal<1>, MAX_DEAD_TIME>,
    last_update_ms: Option<u32>,
}

impl ProcessSimulator {
    /// Gain 2.00, lag 100 updates, dead time 10 updates, 1 s per update.
    pub fn new() -> Self {
        let mut sim = Self {
            gain: FixedDecimal::from_raw(200),
            lag: FixedDecimal::from_raw(100),
            period_ms: 1000,
            deviation: WideDecimal::ZERO,
            pipeline: Deque::new(),
            last_update_ms: None,
        };
        sim.fill_pipeline(10);
        sim
    }

    /// Custom model.  `lag` must be at least 1 and `dead_time` within
    /// `1..=MAX_DEAD_TIME`.
    pub fn with_model(
        gain: FixedDecimal<2>,
        lag: FixedDecimal<0>,
        dead_time: usize,
        period_ms: u32,
    ) -> Result<Self> {
        if lag < FixedDecimal::<0>::ONE {
            return Err(invalid("simulator lag must be at least 1"));
        }
        if !(1..=MAX_DEAD_TIME).contains(&dead_time) {
            return Err(invalid("simulator dead time must be 1..=16 updates"));
        }
        if period_ms == 0 {
            return Err(invalid("simulator period must be at least 1 ms"));
        }
        let mut sim = Self::new();
        sim.gain = gain;
        sim.lag = lag;
        sim.period_ms = period_ms;
        sim.fill_pipeline(dead_time);
        Ok(sim)
    }

    /// Current process value, or `OutOfRange` once the model has left
    /// the range a `FixedDecimal<1>` can report.
    pub fn process_value(&self) -> core::result::Result<FixedDecimal<1>, SensorError> {
        PV_START
            .widen()
            .rescale_wide::<3>()
            .checked_add(self.deviation)
            .and_then(|pv| pv.checked_rescale::<1>())
            .map_err(|_| SensorError::OutOfRange)
    }

    pub fn dead_time(&self) -> usize {
        self.pipeline.len()
    }

    fn fill_pipeline(&mut self, dead_time: usize) {
        self.pipeline.clear();
        for _ in 0..dead_time {
            // Capacity equals MAX_DEAD_TIME and dead_time never exceeds it.
            let _ = self.pipeline.push_back(OUTPUT_START);
        }
    }

    fn advance(&mut self, now_ms: u32) {
        let Some(last) = self.last_update_ms else {
            self.last_update_ms = Some(now_ms);
            return;
        };
        let elapsed = now_ms.wrapping_sub(last);
        let steps = elapsed / self.period_ms;
        for _ in 0..steps.min(MAX_CATCH_UP) {
            self.step();
        }
        self.last_update_ms = Some(now_ms.wrapping_sub(elapsed % self.period_ms));
    }

    fn step(&mut self) {
        let newest = self.pipeline.pop_front().unwrap_or(OUTPUT_START);
        let newest = self.pipeline.back().copied().unwrap_or(newest);
        let _ = self.pipeline.push_back(newest);
        let applied = self.pipeline.front().copied().unwrap_or(OUTPUT_START);

        let drive = self.gain * (applied - OUTPUT_START) / self.lag;
        self.deviation = self.deviation - self.deviation / self.lag + drive;
    }
}

impl Default for ProcessSimulator {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(reason: &'static str) -> Error {
    Error::Config(ConfigError::ValidationFailed(reason))
}

impl InputPort for ProcessSimulator {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn read_input(&mut self, now_ms: u32) -> core::result::Result<FixedDecimal<1>, SensorError> {
        self.advance(now_ms);
        self.process_value()
    }
}

impl OutputPort for ProcessSimulator {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn set_output_percent(
        &mut self,
        percent: FixedDecimal<1>,
        _now_ms: u32,
    ) -> core::result::Result<(), ActuatorError> {
        let percent = percent.clamp(FixedDecimal::ZERO, FixedDecimal::from_raw(1000));
        if let Some(newest) = self.pipeline.back_mut() {
            if *newest != percent {
                debug!("SIM | output {percent}%");
            }
            *newest = percent;
        }
        Ok(())
    }
}
