//! Fixed-point decimal arithmetic with the scale carried in the type.
//!
//! Every physical quantity the controller handles (setpoints, gains,
//! temperatures, output percentages, window lengths) is a scaled integer
//! whose number of decimal places is a const generic parameter:
//!
//! - [`FixedDecimal<S>`]: 16-bit storage, `S` in `0..=4`.  The value is
//!   `raw / 10^S`.
//! - [`WideDecimal<S>`]: 32-bit storage, `S` in `0..=9`.  Produced by
//!   multiplying two `FixedDecimal`s so the product is exact.
//!
//! ## Rules
//!
//! | Operation                  | Operands        | Result scale            |
//! |----------------------------|-----------------|-------------------------|
//! | `==` `<` ...               | any scales      | compares real values    |
//! | `+` `-` `+=` `-=`          | same scale      | `S`                     |
//! | `*`                        | `A`, `B`        | `WideDecimal<A + B>`    |
//! | `/`                        | `A`, `B`        | `A` (dividend's scale)  |
//! | `*=` `/=`                  | `A`, `B`        | `A` (left operand's)    |
//! | `rescale::<M>()`           | `S`             | `M`                     |
//!
//! Narrowing (rescale to fewer digits, division) truncates toward zero.
//! Overflow of the storage width is a caller precondition: the operators
//! wrap, the `checked_*` family reports it.  Scales above the storage
//! bound are rejected at compile time.

mod compare;
mod errors;
mod fixed;
mod serde_impl;
mod wide;

use core::cmp::Ordering;
use core::fmt;

pub use errors::{NumericError, NumericResult};
pub use fixed::FixedDecimal;
pub use wide::WideDecimal;

/// Compute 10^n at compile time.
pub(crate) const fn pow10(n: u8) -> i64 {
    let mut result: i64 = 1;
    let mut i = 0;
    while i < n {
        result *= 10;
        i += 1;
    }
    result
}

/// Move a raw value between scales.  Widening is exact, narrowing
/// truncates toward zero.
///
/// Inputs are bounded by `i32` raws and scales of at most 9, so the
/// widening product always fits in `i64`.
pub(crate) const fn rescale_raw(raw: i64, from: u8, to: u8) -> i64 {
    if to >= from {
        raw * pow10(to - from)
    } else {
        raw / pow10(from - to)
    }
}

/// Raw quotient keeping the dividend's scale: `num * 10^den_scale / den`.
/// `None` when the divisor is zero.
pub(crate) const fn div_raw(num: i64, den: i64, den_scale: u8) -> Option<i64> {
    if den == 0 {
        None
    } else {
        Some(num * pow10(den_scale) / den)
    }
}

/// Order two scaled values by the real numbers they represent.
pub(crate) fn compare_scaled(a: i64, a_scale: u8, b: i64, b_scale: u8) -> Ordering {
    let common = a_scale.max(b_scale);
    rescale_raw(a, a_scale, common).cmp(&rescale_raw(b, b_scale, common))
}

pub(crate) fn fmt_scaled(f: &mut fmt::Formatter<'_>, raw: i64, scale: u8) -> fmt::Result {
    if scale == 0 {
        return write!(f, "{raw}");
    }

    let unit = pow10(scale);
    let int_part = raw / unit;
    let frac_part = (raw % unit).unsigned_abs();
    let width = usize::from(scale);

    if raw < 0 && int_part == 0 {
        write!(f, "-0.{frac_part:0>width$}")
    } else {
        write!(f, "{int_part}.{frac_part:0>width$}")
    }
}

/// Parse decimal text into a raw value at `scale`.
///
/// Accepts an optional sign, an integer part and an optional fractional
/// part.  Fractional digits beyond `scale` are only accepted when they
/// are zeros.
pub(crate) fn parse_scaled(s: &str, scale: u8) -> NumericResult<i64> {
    let s = s.trim();
    let (negative, digits) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s.strip_prefix('+').unwrap_or(s))
    };

    let (int_str, frac_str) = digits.split_once('.').unwrap_or((digits, ""));
    if int_str.is_empty() && frac_str.is_empty() {
        return Err(NumericError::InvalidInput);
    }
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(int_str) || !is_digits(frac_str) {
        return Err(NumericError::InvalidInput);
    }

    let (kept, dropped) = frac_str.split_at(frac_str.len().min(usize::from(scale)));
    if dropped.bytes().any(|b| b != b'0') {
        return Err(NumericError::PrecisionLoss);
    }

    let range_err = NumericError::out_of_range(!negative);
    let mut value: i64 = 0;
    for b in int_str.bytes().chain(kept.bytes()) {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(b - b'0')))
            .ok_or(range_err)?;
    }
    for _ in kept.len()..usize::from(scale) {
        value = value.checked_mul(10).ok_or(range_err)?;
    }

    Ok(if negative { -value } else { value })
}
