//! Relay auto-tuner.
//!
//! Replaces the PID with a relay around the starting output: output
//! `start + step` while the process value is below `pv0 + noise band`,
//! `start - step` once it has risen above, and back up when it falls
//! below `pv0 - noise band`.  The process settles into a limit cycle
//! whose amplitude `a` and period `Pu` give the ultimate gain
//!
//! ```text
//! Ku = 4 · step / (π · a)
//! ```
//!
//! from which a [`TuningRule`] derives Kp, Ki and Kd.
//!
//! Peaks are found against a lookback window: a sample at or above every
//! sample in the window is a maximum, at or below every one a minimum.
//! The oscillation has converged once the last four peaks agree on the
//! amplitude within 5 %.

use heapless::Deque;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::control::pid::{Gain, Value};
use crate::decimal::FixedDecimal;
use crate::error::TuningError;

/// Noise band resolution.
pub type NoiseBand = FixedDecimal<3>;

/// Most samples held in the lookback window.
pub const MAX_LOOKBACK_SAMPLES: usize = 100;

pub const DEFAULT_OUTPUT_STEP: Value = Value::from_raw(100); // 10.0 %
pub const DEFAULT_NOISE_BAND: NoiseBand = NoiseBand::from_raw(500); // 0.500
pub const DEFAULT_LOOKBACK_SEC: u16 = 10;

/// Longest wait for the next peak before giving up.
pub const MAX_PEAK_WAIT_MS: u32 = 5 * 60 * 1000;
/// Peak type changes (five cycles) before giving up.
pub const MAX_PEAKS: u8 = 20;

/// Window lengths below this are sampled every 250 ms.
const FAST_LOOKBACK_SEC: u16 = 25;
const FAST_SAMPLE_MS: u32 = 250;

/// 4/π as 4 · 113 / 355.
const PI_NUM: i64 = 355;
const PI_DEN: i64 = 113;

/// Tuning rules, as divisors of `Ku` and `Pu` in units of 0.05.
///
/// Ziegler-Nichols is intended for disturbance rejection.  Tyreus-Luyben
/// is more conservative and suits lag-dominated processes;
/// Ciancone-Marlin suits delay-dominated ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TuningRule {
    ZieglerNicholsPi,
    #[default]
    ZieglerNicholsPid,
    TyreusLuybenPi,
    TyreusLuybenPid,
    CianconeMarlinPi,
    CianconeMarlinPid,
    PessenIntegralPid,
    SomeOvershootPid,
    NoOvershootPid,
}

impl TuningRule {
    /// `(Kp, Ti, Td)` divisors: `Kp = Ku / (d0 · 0.05)`,
    /// `Ti = Pu / (d1 · 0.05)`, `Td = Pu / (d2 · 0.05)`.  `d2 == 0` means
    /// no derivative action.
    pub const fn divisors(self) -> (u8, u8, u8) {
        match self {
            Self::ZieglerNicholsPi => (44, 24, 0),
            Self::ZieglerNicholsPid => (34, 40, 160),
            Self::TyreusLuybenPi => (64, 9, 0),
            Self::TyreusLuybenPid => (44, 9, 126),
            Self::CianconeMarlinPi => (66, 80, 0),
            Self::CianconeMarlinPid => (66, 88, 162),
            Self::PessenIntegralPid => (28, 50, 133),
            Self::SomeOvershootPid => (60, 40, 60),
            Self::NoOvershootPid => (100, 40, 60),
        }
    }

    pub const fn has_derivative(self) -> bool {
        self.divisors().2 != 0
    }
}

/// Parameters of one tuning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTuneSettings {
    pub rule: TuningRule,
    /// Relay amplitude around the starting output (percent).
    pub output_step: Value,
    /// Hysteresis half-width around the starting process value.
    pub noise_band: NoiseBand,
    /// Length of the peak-detection window (seconds, minimum 1).
    pub lookback_sec: u16,
}

impl Default for AutoTuneSettings {
    fn default() -> Self {
        Self {
            rule: TuningRule::default(),
            output_step: DEFAULT_OUTPUT_STEP,
            noise_band: DEFAULT_NOISE_BAND,
            lookback_sec: DEFAULT_LOOKBACK_SEC,
        }
    }
}

impl AutoTuneSettings {
    pub fn validate(&self) -> Result<(), TuningError> {
        if !self.output_step.is_positive() || self.noise_band.is_negative() {
            return Err(TuningError::InvalidAutoTuneSettings);
        }
        Ok(())
    }

    /// `(samples in the window, sample period in ms)`.
    ///
    /// Short windows hold four samples per second; from 25 s up the
    /// window holds 100 samples spread over its length.
    pub fn lookback(&self) -> (usize, u32) {
        let sec = self.lookback_sec.max(1);
        if sec < FAST_LOOKBACK_SEC {
            (usize::from(sec) * 4, FAST_SAMPLE_MS)
        } else {
            (MAX_LOOKBACK_SAMPLES, u32::from(sec) * 10)
        }
    }
}

/// Gains found by a converged run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunedGains {
    pub kp: Gain,
    pub ki: Gain,
    pub kd: Gain,
    /// Period of the induced oscillation.
    pub ultimate_period_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneFailure {
    /// No new peak within [`MAX_PEAK_WAIT_MS`].
    PeakTimeout,
    /// [`MAX_PEAKS`] peaks without a stable amplitude.
    NotConverging,
    /// The rule produced a gain outside the `Gain` range.
    GainOutOfRange,
}

/// Result of feeding one reading to the tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneStatus {
    /// Still oscillating; drive the process with this output.
    Running(Value),
    /// Done; the output is back at its starting value.
    Converged(TunedGains),
    Failed(TuneFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relay {
    StepUp,
    StepDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peak {
    Maximum,
    Minimum,
}

/// Relay auto-tuner state.
#[derive(Debug, Clone)]
pub struct AutoTuner {
    settings: AutoTuneSettings,
    relay: Relay,
    /// Process value at the start; the relay switches around it.
    baseline: Value,
    output_start: Value,
    output_min: Value,
    output_max: Value,
    output: Value,
    lookback_len: usize,
    sample_ms: u32,
    /// Oldest reading at the front.
    window: Deque<Value, MAX_LOOKBACK_SAMPLES>,
    last_sample_ms: Option<u32>,
    last_peak: Option<Peak>,
    peak_count: u8,
    /// Most recent first; `[0]` is the extreme still being tracked.
    peaks: [Value; 5],
    peak_times: [u32; 5],
    finished: Option<TuneStatus>,
}

impl AutoTuner {
    /// Begin a run from the current reading and output.  The relay
    /// output is held inside `output_min..=output_max`.
    pub fn start(
        settings: AutoTuneSettings,
        now_ms: u32,
        input: Value,
        output: Value,
        output_min: Value,
        output_max: Value,
    ) -> Result<Self, TuningError> {
        settings.validate()?;
        if output_min >= output_max {
            return Err(TuningError::InvalidOutputLimits);
        }
        let (lookback_len, sample_ms) = settings.lookback();
        info!(
            "Auto-tune started: {:?}, step {}%, noise band {}, lookback {} samples every {} ms",
            settings.rule, settings.output_step, settings.noise_band, lookback_len, sample_ms,
        );
        Ok(Self {
            settings,
            relay: Relay::StepUp,
            baseline: input,
            output_start: output,
            output_min,
            output_max,
            output,
            lookback_len,
            sample_ms,
            window: Deque::new(),
            last_sample_ms: None,
            last_peak: None,
            peak_count: 0,
            peaks: [input; 5],
            peak_times: [now_ms; 5],
            finished: None,
        })
    }

    pub fn settings(&self) -> &AutoTuneSettings {
        &self.settings
    }

    /// Output the tuner wants applied.
    pub fn output(&self) -> Value {
        self.output
    }

    /// Output in effect when the run started; restored when it ends.
    pub fn output_start(&self) -> Value {
        self.output_start
    }

    pub fn peak_count(&self) -> u8 {
        self.peak_count
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Feed one reading.  Readings arriving faster than the sample
    /// period only return the current status.
    pub fn update(&mut self, now_ms: u32, input: Value) -> TuneStatus {
        if let Some(done) = self.finished {
            return done;
        }
        if let Some(last) = self.last_sample_ms {
            if now_ms.wrapping_sub(last) < self.sample_ms {
                return TuneStatus::Running(self.output);
            }
        }
        self.last_sample_ms = Some(now_ms);

        self.switch_relay(input);

        // Extremes are not trusted until the window is full.
        if self.window.len() < self.lookback_len {
            let _ = self.window.push_back(input);
            return TuneStatus::Running(self.output);
        }

        let (low, high) = self
            .window
            .iter()
            .fold((input, input), |(lo, hi), &x| (lo.min(x), hi.max(x)));
        self.window.pop_front();
        let _ = self.window.push_back(input);

        let changed = self.track_peak(now_ms, input, input >= high, input <= low);

        if changed && self.peak_count > 4 && self.amplitude_converged() {
            return self.finish(self.gains());
        }
        if now_ms.wrapping_sub(self.peak_times[0]) > MAX_PEAK_WAIT_MS {
            return self.finish(TuneStatus::Failed(TuneFailure::PeakTimeout));
        }
        if self.peak_count >= MAX_PEAKS {
            return self.finish(TuneStatus::Failed(TuneFailure::NotConverging));
        }
        TuneStatus::Running(self.output)
    }

    fn switch_relay(&mut self, input: Value) {
        let baseline = self.baseline.widen().rescale_wide::<3>();
        let band = self.settings.noise_band.widen();
        match self.relay {
            Relay::StepUp if input > baseline + band => self.relay = Relay::StepDown,
            Relay::StepDown if input < baseline - band => self.relay = Relay::StepUp,
            _ => {}
        }
        let step = self.settings.output_step;
        self.output = match self.relay {
            Relay::StepUp => self.output_start.saturating_add(step),
            Relay::StepDown => self.output_start.saturating_sub(step),
        }
        .clamp(self.output_min, self.output_max);
    }

    /// Record an extreme.  Returns `true` when the peak type flipped,
    /// which closes the previous peak.
    fn track_peak(&mut self, now_ms: u32, input: Value, is_max: bool, is_min: bool) -> bool {
        let kind = if is_max {
            Peak::Maximum
        } else if is_min {
            Peak::Minimum
        } else {
            return false;
        };
        let changed = self.last_peak.is_some_and(|last| last != kind);
        self.last_peak = Some(kind);

        if changed {
            self.peak_count = self.peak_count.saturating_add(1);
            self.peaks.copy_within(0..4, 1);
            self.peak_times.copy_within(0..4, 1);
            debug!(
                "Auto-tune peak {}: {:?} {} at {} ms",
                self.peak_count, kind, self.peaks[1], self.peak_times[1]
            );
        }
        self.peaks[0] = input;
        self.peak_times[0] = now_ms;
        changed
    }

    /// Sum of the last three peak-to-peak swings, in raw tenths.
    fn swing_sum(&self) -> i32 {
        self.peaks[1..=4]
            .windows(2)
            .map(|w| (i32::from(w[1].raw_value()) - i32::from(w[0].raw_value())).abs())
            .sum()
    }

    /// Half the peak spread within 5 % of the mean amplitude `sum / 6`:
    /// `(range / 2 - a) / a < 0.05`, i.e. `60 · range < 21 · sum`.
    fn amplitude_converged(&self) -> bool {
        let sum = self.swing_sum();
        if sum == 0 {
            return false;
        }
        let closed = &self.peaks[1..=4];
        let (lo, hi) = closed
            .iter()
            .fold((closed[0], closed[0]), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        let range = i32::from(hi.raw_value()) - i32::from(lo.raw_value());
        60 * i64::from(range) < 21 * i64::from(sum)
    }

    fn gains(&self) -> TuneStatus {
        let period_x2 = self.peak_times[1]
            .wrapping_sub(self.peak_times[3])
            .wrapping_add(self.peak_times[2].wrapping_sub(self.peak_times[4]));
        match tuned_gains(
            self.settings.rule,
            self.settings.output_step,
            self.swing_sum(),
            period_x2,
        ) {
            Some(gains) => TuneStatus::Converged(gains),
            None => TuneStatus::Failed(TuneFailure::GainOutOfRange),
        }
    }

    fn finish(&mut self, status: TuneStatus) -> TuneStatus {
        self.output = self.output_start;
        match status {
            TuneStatus::Converged(g) => info!(
                "Auto-tune converged after {} peaks: kp={} ki={} kd={} (Pu {} ms)",
                self.peak_count, g.kp, g.ki, g.kd, g.ultimate_period_ms
            ),
            TuneStatus::Failed(cause) => {
                warn!("Auto-tune failed after {} peaks: {:?}", self.peak_count, cause);
            }
            TuneStatus::Running(_) => {}
        }
        self.finished = Some(status);
        status
    }
}

/// Apply `rule` to an oscillation of mean amplitude `swing_sum / 6`
/// (raw tenths) driven by a relay of `output_step`, with
/// `period_x2_ms` twice the ultimate period.
///
/// With `Ku = 24 · step / (π · sum)` in whole units:
///
/// ```text
/// Kp = Ku · 20 / d0
/// Ki = Kp · 100 · d1 / period_x2      (1/s)
/// Kd = Kp · period_x2 / (100 · d2)    (s)
/// ```
fn tuned_gains(
    rule: TuningRule,
    output_step: Value,
    swing_sum: i32,
    period_x2_ms: u32,
) -> Option<TunedGains> {
    let (d0, d1, d2) = rule.divisors();
    let step = i64::from(output_step.raw_value());
    let sum = i64::from(swing_sum);
    let period_x2 = i64::from(period_x2_ms);
    if sum <= 0 || period_x2 == 0 {
        return None;
    }

    // Kp in thousandths = num / den
    let num = step.checked_mul(24 * PI_DEN * 20 * 1000)?;
    let den = sum.checked_mul(PI_NUM * i64::from(d0))?;

    let kp = num / den;
    let ki = num.checked_mul(100 * i64::from(d1))? / den.checked_mul(period_x2)?;
    let kd = if d2 == 0 {
        0
    } else {
        num.checked_mul(period_x2)? / den.checked_mul(100 * i64::from(d2))?
    };

    let gain = |raw: i64| i16::try_from(raw).ok().map(Gain::from_raw);
    Some(TunedGains {
        kp: gain(kp)?,
        ki: gain(ki)?,
        kd: gain(kd)?,
        ultimate_period_ms: period_x2_ms / 2,
    })
}
