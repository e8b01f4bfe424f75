//! Mock hardware for integration tests.
//!
//! A scripted thermocouple plus a real [`SsrOutput`] driving a recording
//! pin, so tests can assert on the exact pin history without touching
//! GPIO registers.

use std::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use ospid::FixedDecimal;
use ospid::app::events::AppEvent;
use ospid::app::ports::{EventSink, InputPort, OutputPort};
use ospid::drivers::SsrOutput;
use ospid::error::{ActuatorError, SensorError};

// ── Pin ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockPin {
    pub high: bool,
    pub writes: usize,
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.writes += 1;
        Ok(())
    }
}

// ── Bench: scripted input + SSR output ────────────────────────

pub struct Bench {
    /// Next reading; `None` simulates an open thermocouple.
    pub reading: Option<FixedDecimal<1>>,
    pub ssr: SsrOutput<MockPin>,
    /// Every percent value the control loop wrote.
    pub outputs: Vec<FixedDecimal<1>>,
}

#[allow(dead_code)]
impl Bench {
    pub fn new(reading: &str) -> Self {
        Self {
            reading: Some(v(reading)),
            ssr: SsrOutput::new(MockPin::default()),
            outputs: Vec::new(),
        }
    }

    pub fn set_reading(&mut self, reading: &str) {
        self.reading = Some(v(reading));
    }

    pub fn last_output(&self) -> Option<FixedDecimal<1>> {
        self.outputs.last().copied()
    }
}

impl InputPort for Bench {
    fn identifier(&self) -> &'static str {
        "Scripted TC"
    }

    fn read_input(&mut self, _now_ms: u32) -> Result<FixedDecimal<1>, SensorError> {
        self.reading.ok_or(SensorError::ReadFailed)
    }
}

impl OutputPort for Bench {
    fn identifier(&self) -> &'static str {
        self.ssr.identifier()
    }

    fn set_output_percent(
        &mut self,
        percent: FixedDecimal<1>,
        now_ms: u32,
    ) -> Result<(), ActuatorError> {
        self.outputs.push(percent);
        self.ssr.set_output_percent(percent, now_ms)
    }

    fn set_output_window(&mut self, seconds: FixedDecimal<1>) -> Result<(), ActuatorError> {
        self.ssr.set_window_seconds(seconds)
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

pub fn v(s: &str) -> FixedDecimal<1> {
    s.parse().expect("test literal")
}
