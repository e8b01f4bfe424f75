//! osPID controller firmware library.
//!
//! Fixed-point decimal arithmetic ([`decimal`]) sized for an 8-bit
//! target, and the control core built on it: the PID algorithm and its
//! relay auto-tuner, the SSR time-proportioning output, the
//! over/under-temperature trip, setpoint profiles, and the
//! [`app::service::ControlLoop`] that wires them to hardware through
//! port traits.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod decimal;
pub mod drivers;
pub mod error;
pub mod profile;
pub mod safety;

pub use decimal::{FixedDecimal, NumericError, NumericResult, WideDecimal};
pub use error::{Error, Result};
