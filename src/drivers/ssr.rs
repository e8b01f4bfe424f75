//! Solid-state relay output driver.
//!
//! Time-proportioning output: the SSR is switched on for `percent` of a
//! fixed window and off for the rest.  The caller drives it with a
//! millisecond clock; there is no timer of its own.
//!
//! ## Dual-target design
//!
//! The driver is generic over [`embedded_hal::digital::OutputPin`], so the
//! firmware binary hands it a real GPIO and tests hand it a recording mock.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::OutputPort;
use crate::decimal::FixedDecimal;
use crate::error::ActuatorError;

pub const IDENTIFIER: &str = "SSR Output";

/// Default window: 5.0 s, suitable for an SSR.  Mechanical relays need longer.
pub const DEFAULT_WINDOW: FixedDecimal<1> = FixedDecimal::from_raw(50);
/// Shortest accepted window: 1.0 s.
pub const MIN_WINDOW: FixedDecimal<1> = FixedDecimal::from_raw(10);

const FULL_SCALE: FixedDecimal<1> = FixedDecimal::from_raw(1000);

pub struct SsrOutput<P> {
    pin: P,
    window: FixedDecimal<1>,
    window_ms: u32,
    on: bool,
}

impl<P: OutputPin> SsrOutput<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            window: DEFAULT_WINDOW,
            window_ms: window_ms(DEFAULT_WINDOW),
            on: false,
        }
    }

    pub fn window_seconds(&self) -> FixedDecimal<1> {
        self.window
    }

    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }

    /// Change the window length.  Windows under [`MIN_WINDOW`] are rejected
    /// and the previous window is kept.
    pub fn set_window_seconds(&mut self, seconds: FixedDecimal<1>) -> Result<(), ActuatorError> {
        if seconds < MIN_WINDOW {
            warn!("SSR: window {seconds} s rejected, minimum is {MIN_WINDOW} s");
            return Err(ActuatorError::WindowTooShort);
        }
        self.window = seconds;
        self.window_ms = window_ms(seconds);
        debug!("SSR: window {} s ({} ms)", seconds, self.window_ms);
        Ok(())
    }

    /// Drive the pin for `percent` (clamped to 0–100) at time `now_ms`.
    pub fn set_output_percent(
        &mut self,
        percent: FixedDecimal<1>,
        now_ms: u32,
    ) -> Result<(), ActuatorError> {
        let on = on_time_ms(percent, self.window) > now_ms % self.window_ms;
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        res.map_err(|_| ActuatorError::PinWriteFailed)?;
        self.on = on;
        Ok(())
    }

    /// Whether the last write switched the SSR on.
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> OutputPort for SsrOutput<P> {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn set_output_percent(
        &mut self,
        percent: FixedDecimal<1>,
        now_ms: u32,
    ) -> Result<(), ActuatorError> {
        SsrOutput::set_output_percent(self, percent, now_ms)
    }

    fn set_output_window(&mut self, seconds: FixedDecimal<1>) -> Result<(), ActuatorError> {
        self.set_window_seconds(seconds)
    }
}

fn window_ms(seconds: FixedDecimal<1>) -> u32 {
    // Tenths of a second to milliseconds.
    u32::from(seconds.raw_value().unsigned_abs()) * 100
}

/// On-time within one window, truncated to whole milliseconds.
fn on_time_ms(percent: FixedDecimal<1>, window: FixedDecimal<1>) -> u32 {
    let percent = percent.clamp(FixedDecimal::ZERO, FULL_SCALE);
    // percent · seconds at scale 2; one unit of it is 10 ms / 100 %.
    let product = percent * window;
    product.raw_value().unsigned_abs() / 10
}
