//! Trip supervisor.
//!
//! The supervisor runs **every tick before the PID** and decides whether
//! the process value has left the permitted band.  While tripped the
//! control loop forces the output to zero.
//!
//! ## Trip lifecycle
//!
//! 1. The process value crosses a configured limit.
//! 2. The supervisor latches `tripped`.
//! 3. With auto-reset, the trip clears once the value is back inside the
//!    band.  Without it, the trip holds until [`TripSupervisor::reset`],
//!    and a reset while still outside re-trips on the next evaluation.

use log::{error, info};

use crate::app::ports::ConfigError;
use crate::decimal::FixedDecimal;
use crate::error::{Error, Result};

type Value = FixedDecimal<1>;

/// Which limit caused the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCause {
    BelowLower,
    AboveUpper,
}

/// Outcome of one evaluation, for event reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripTransition {
    Unchanged,
    Tripped(TripCause),
    Cleared,
}

#[derive(Debug, Clone)]
pub struct TripSupervisor {
    lower: Option<Value>,
    upper: Option<Value>,
    auto_reset: bool,
    tripped: Option<TripCause>,
}

impl TripSupervisor {
    /// A supervisor with no limits never trips.
    pub fn new(lower: Option<Value>, upper: Option<Value>, auto_reset: bool) -> Result<Self> {
        let mut sup = Self {
            lower: None,
            upper: None,
            auto_reset,
            tripped: None,
        };
        sup.set_limits(lower, upper)?;
        Ok(sup)
    }

    pub fn set_limits(&mut self, lower: Option<Value>, upper: Option<Value>) -> Result<()> {
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo >= hi {
                return Err(Error::Config(ConfigError::ValidationFailed(
                    "trip lower limit must be below upper limit",
                )));
            }
        }
        self.lower = lower;
        self.upper = upper;
        Ok(())
    }

    pub fn limits(&self) -> (Option<Value>, Option<Value>) {
        (self.lower, self.upper)
    }

    pub fn set_auto_reset(&mut self, auto_reset: bool) {
        self.auto_reset = auto_reset;
    }

    pub fn auto_reset(&self) -> bool {
        self.auto_reset
    }

    /// Check the process value against the limits.
    pub fn evaluate(&mut self, input: Value) -> TripTransition {
        let cause = match (self.lower, self.upper) {
            (Some(lo), _) if input < lo => Some(TripCause::BelowLower),
            (_, Some(hi)) if input > hi => Some(TripCause::AboveUpper),
            _ => None,
        };

        match (self.tripped, cause) {
            (None, Some(c)) => {
                error!("TRIP SET: {c:?}, input={input}");
                self.tripped = Some(c);
                TripTransition::Tripped(c)
            }
            (Some(_), None) if self.auto_reset => {
                info!("TRIP CLEARED: input={input} back inside limits");
                self.tripped = None;
                TripTransition::Cleared
            }
            _ => TripTransition::Unchanged,
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.is_some()
    }

    pub fn cause(&self) -> Option<TripCause> {
        self.tripped
    }

    /// Manually clear a latched trip.
    pub fn reset(&mut self) {
        if self.tripped.take().is_some() {
            info!("TRIP CLEARED: manual reset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Value {
        s.parse().unwrap()
    }

    #[test]
    fn no_limits_never_trips() {
        let mut sup = TripSupervisor::new(None, None, false).unwrap();
        assert_eq!(sup.evaluate(Value::MAX), TripTransition::Unchanged);
        assert_eq!(sup.evaluate(Value::MIN), TripTransition::Unchanged);
        assert!(!sup.is_tripped());
    }

    #[test]
    fn inverted_limits_rejected() {
        assert!(matches!(
            TripSupervisor::new(Some(v("50")), Some(v("50")), false),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn limits_are_inclusive() {
        let mut sup = TripSupervisor::new(Some(v("10")), Some(v("90")), false).unwrap();
        assert_eq!(sup.evaluate(v("10")), TripTransition::Unchanged);
        assert_eq!(sup.evaluate(v("90")), TripTransition::Unchanged);
        assert_eq!(sup.evaluate(v("90.1")), TripTransition::Tripped(TripCause::AboveUpper));
    }

    #[test]
    fn latches_without_auto_reset() {
        let mut sup = TripSupervisor::new(Some(v("10")), None, false).unwrap();
        assert_eq!(sup.evaluate(v("9.9")), TripTransition::Tripped(TripCause::BelowLower));
        assert_eq!(sup.evaluate(v("50")), TripTransition::Unchanged);
        assert!(sup.is_tripped());

        sup.reset();
        assert!(!sup.is_tripped());
        assert_eq!(sup.evaluate(v("50")), TripTransition::Unchanged);
    }

    #[test]
    fn reset_while_outside_retrips() {
        let mut sup = TripSupervisor::new(None, Some(v("100")), false).unwrap();
        sup.evaluate(v("120"));
        sup.reset();
        assert_eq!(sup.evaluate(v("120")), TripTransition::Tripped(TripCause::AboveUpper));
    }

    #[test]
    fn auto_reset_clears_inside_band() {
        let mut sup = TripSupervisor::new(None, Some(v("100")), true).unwrap();
        assert_eq!(sup.evaluate(v("100.5")), TripTransition::Tripped(TripCause::AboveUpper));
        assert_eq!(sup.evaluate(v("100.1")), TripTransition::Unchanged);
        assert_eq!(sup.evaluate(v("99")), TripTransition::Cleared);
        assert_eq!(sup.cause(), None);
    }
}
