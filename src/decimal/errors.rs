//! Error types for fixed-point arithmetic.

use core::fmt;

/// Errors reported by the checked fixed-point operations.
///
/// The plain operators never return these: they wrap on overflow and
/// panic on a zero divisor, the same contract as Rust's primitive integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericError {
    /// Result exceeded the storage maximum.
    Overflow,
    /// Result fell below the storage minimum.
    Underflow,
    /// Divisor represents the value zero.
    DivisionByZero,
    /// Text carried more fractional digits than the scale can hold.
    PrecisionLoss,
    /// Text could not be parsed as a decimal.
    InvalidInput,
}

impl NumericError {
    /// Overflow or underflow depending on which way the result ran out of range.
    pub(crate) const fn out_of_range(positive: bool) -> Self {
        if positive { Self::Overflow } else { Self::Underflow }
    }
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "arithmetic overflow: result exceeded maximum value"),
            Self::Underflow => write!(f, "arithmetic underflow: result below minimum value"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::PrecisionLoss => write!(f, "precision loss: too many fractional digits"),
            Self::InvalidInput => write!(f, "invalid input: could not parse value"),
        }
    }
}

impl std::error::Error for NumericError {}

/// Result alias for the checked numeric operations.
pub type NumericResult<T> = Result<T, NumericError>;
