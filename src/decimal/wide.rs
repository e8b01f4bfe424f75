//! `WideDecimal<S>`: 32-bit intermediate for products and accumulators.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::{Add, AddAssign, Div, Neg, Sub, SubAssign};
use core::str::FromStr;

use super::errors::{NumericError, NumericResult};
use super::fixed::FixedDecimal;
use super::{div_raw, fmt_scaled, parse_scaled, pow10, rescale_raw};

/// Fixed-point decimal with `S` decimal places stored as an `i32`.
///
/// This is the result type of `FixedDecimal<A> * FixedDecimal<B>`, whose
/// scale `A + B` can reach 8.  It follows the same rules as
/// [`FixedDecimal`]: same-scale `+`/`-`, dividend-scale `/`, cross-scale
/// comparison, explicit rescale.  Narrow it back with
/// [`rescale`](Self::rescale).
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct WideDecimal<const S: u8>(i32);

impl<const S: u8> WideDecimal<S> {
    /// Largest scale whose unit (`10^S`) fits the 32-bit storage.
    pub const MAX_SCALE: u8 = 9;

    const VALID_SCALE: () = assert!(
        S <= Self::MAX_SCALE,
        "WideDecimal scale exceeds the 32-bit storage bound"
    );

    /// The scale factor (10^S).
    pub const SCALE: i32 = {
        let () = Self::VALID_SCALE;
        pow10(S) as i32
    };

    pub const ZERO: Self = Self::from_raw(0);
    pub const ONE: Self = Self::from_raw(Self::SCALE);
    pub const MIN: Self = Self::from_raw(i32::MIN);
    pub const MAX: Self = Self::from_raw(i32::MAX);

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        let () = Self::VALID_SCALE;
        Self(raw)
    }

    #[inline]
    pub const fn raw_value(self) -> i32 {
        self.0
    }

    /// Integer part, truncated toward zero.
    #[inline]
    pub const fn integer_part(self) -> i32 {
        self.0 / Self::SCALE
    }

    #[inline]
    pub const fn fractional_part(self) -> u32 {
        (self.0 % Self::SCALE).unsigned_abs()
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    /// # Errors
    /// `Overflow` or `Underflow` if the sum does not fit.
    #[inline]
    pub fn checked_add(self, rhs: Self) -> NumericResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(NumericError::out_of_range(rhs.0 > 0))
    }

    /// # Errors
    /// `Overflow` or `Underflow` if the difference does not fit.
    #[inline]
    pub fn checked_sub(self, rhs: Self) -> NumericResult<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(NumericError::out_of_range(rhs.0 < 0))
    }

    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Checked division by a 16-bit decimal, keeping this value's scale.
    ///
    /// # Errors
    /// `DivisionByZero` if `rhs` is zero, `Overflow`/`Underflow` if the
    /// quotient does not fit.
    pub fn checked_div<const B: u8>(self, rhs: FixedDecimal<B>) -> NumericResult<Self> {
        let q = div_raw(i64::from(self.0), i64::from(rhs.raw_value()), B)
            .ok_or(NumericError::DivisionByZero)?;
        i32::try_from(q)
            .map(Self)
            .map_err(|_| NumericError::out_of_range(q > 0))
    }

    /// Multiply by the integer ratio `num / den`, truncating toward zero.
    ///
    /// Used to scale per-second rates by a sample period in milliseconds.
    ///
    /// # Errors
    /// `DivisionByZero` if `den` is zero, `Overflow`/`Underflow` if the
    /// result does not fit.
    pub fn checked_mul_ratio(self, num: i32, den: i32) -> NumericResult<Self> {
        if den == 0 {
            return Err(NumericError::DivisionByZero);
        }
        let scaled = i64::from(self.0) * i64::from(num) / i64::from(den);
        i32::try_from(scaled)
            .map(Self)
            .map_err(|_| NumericError::out_of_range(scaled > 0))
    }

    /// Narrow to a 16-bit decimal at scale `M`.
    ///
    /// Digits below `M` are truncated toward zero.  A value outside the
    /// 16-bit range wraps; use [`checked_rescale`](Self::checked_rescale)
    /// when that is possible.
    #[inline]
    pub fn rescale<const M: u8>(self) -> FixedDecimal<M> {
        FixedDecimal::from_raw(rescale_raw(i64::from(self.0), S, M) as i16)
    }

    /// # Errors
    /// `Overflow` or `Underflow` if the result leaves the 16-bit range.
    pub fn checked_rescale<const M: u8>(self) -> NumericResult<FixedDecimal<M>> {
        let raw = rescale_raw(i64::from(self.0), S, M);
        i16::try_from(raw)
            .map(FixedDecimal::from_raw)
            .map_err(|_| NumericError::out_of_range(raw > 0))
    }

    /// Change scale while staying 32-bit.  Widening wraps past `i32`.
    #[inline]
    pub fn rescale_wide<const M: u8>(self) -> WideDecimal<M> {
        WideDecimal::from_raw(rescale_raw(i64::from(self.0), S, M) as i32)
    }
}

impl<const S: u8> Default for WideDecimal<S> {
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const S: u8> From<FixedDecimal<S>> for WideDecimal<S> {
    #[inline]
    fn from(value: FixedDecimal<S>) -> Self {
        value.widen()
    }
}

impl<const S: u8> Eq for WideDecimal<S> {}

impl<const S: u8> Ord for WideDecimal<S> {
    #[inline]
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<const S: u8> Hash for WideDecimal<S> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<const S: u8> Neg for WideDecimal<S> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl<const S: u8> Add for WideDecimal<S> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl<const S: u8> Sub for WideDecimal<S> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl<const S: u8> AddAssign for WideDecimal<S> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const S: u8> SubAssign for WideDecimal<S> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Quotient at the dividend's scale, truncated toward zero.  A quotient
/// outside the 32-bit range wraps; [`checked_div`](WideDecimal::checked_div)
/// reports it.
///
/// # Panics
/// Panics with `division by zero` if `rhs` is zero.
impl<const A: u8, const B: u8> Div<FixedDecimal<B>> for WideDecimal<A> {
    type Output = Self;

    #[inline]
    fn div(self, rhs: FixedDecimal<B>) -> Self {
        match div_raw(i64::from(self.0), i64::from(rhs.raw_value()), B) {
            Some(q) => Self(q as i32),
            None => panic!("{}", NumericError::DivisionByZero),
        }
    }
}

impl<const S: u8> fmt::Debug for WideDecimal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WideDecimal<{}>({}, raw={})", S, self, self.0)
    }
}

impl<const S: u8> fmt::Display for WideDecimal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_scaled(f, i64::from(self.0), S)
    }
}

impl<const S: u8> FromStr for WideDecimal<S> {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = parse_scaled(s, S)?;
        i32::try_from(raw)
            .map(Self::from_raw)
            .map_err(|_| NumericError::out_of_range(raw > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type D1 = FixedDecimal<1>;
    type D2 = FixedDecimal<2>;
    type W4 = WideDecimal<4>;

    #[test]
    fn product_then_divide_then_rescale() {
        let ten = D2::from_raw(1000);
        let hundred = D1::from_raw(1000);

        let q = ten * ten / hundred;
        assert_eq!(q.raw_value(), 10_000);
        assert_eq!(q.rescale::<3>(), FixedDecimal::<0>::from_raw(1));
    }

    #[test]
    fn compares_against_narrow_values() {
        let w = W4::from_raw(12_345); // 1.2345
        assert!(w > D1::from_raw(12));
        assert!(w < D1::from_raw(13));
        assert!(D2::from_raw(124) > w);
        assert_eq!(W4::from_raw(15_000), D1::from_raw(15));
        assert_eq!(D1::from_raw(15), WideDecimal::<8>::from_raw(150_000_000));
    }

    #[test]
    fn narrowing_rescale_truncates() {
        assert_eq!(W4::from_raw(19_999).rescale::<1>().raw_value(), 19);
        assert_eq!(W4::from_raw(-19_999).rescale::<1>().raw_value(), -19);
    }

    #[test]
    fn checked_rescale_out_of_range() {
        let big = W4::from_raw(500_000_000); // 50000.0
        assert_eq!(big.checked_rescale::<1>(), Err(NumericError::Overflow));
        assert_eq!((-big).checked_rescale::<0>(), Err(NumericError::Underflow));
        assert_eq!(W4::from_raw(25_000).checked_rescale::<0>(), Ok(FixedDecimal::from_raw(2)));
    }

    #[test]
    fn rescale_wide_round_trip() {
        let w = WideDecimal::<2>::from_raw(-12_345);
        let up = w.rescale_wide::<6>();
        assert_eq!(up.raw_value(), -123_450_000);
        assert_eq!(up.rescale_wide::<2>(), w);
    }

    #[test]
    fn mul_ratio() {
        let w = W4::from_raw(10_000);
        assert_eq!(w.checked_mul_ratio(250, 1000), Ok(W4::from_raw(2_500)));
        assert_eq!(w.checked_mul_ratio(1, 0), Err(NumericError::DivisionByZero));
        assert_eq!(W4::MAX.checked_mul_ratio(2, 1), Err(NumericError::Overflow));
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn division_by_zero_panics() {
        let _ = W4::ONE / D2::ZERO;
    }

    #[test]
    fn division_overflow_wraps_and_checked_reports_it() {
        let min = WideDecimal::<0>::MIN;
        let minus_one = FixedDecimal::<0>::from_raw(-1);
        assert_eq!(min / minus_one, min);
        assert_eq!(min.checked_div(minus_one), Err(NumericError::Overflow));
    }

    #[test]
    fn checked_div_zero() {
        assert_eq!(W4::ONE.checked_div(D1::ZERO), Err(NumericError::DivisionByZero));
    }

    #[test]
    fn saturating_and_checked() {
        assert_eq!(W4::MAX.saturating_add(W4::ONE), W4::MAX);
        assert_eq!(W4::MIN.saturating_sub(W4::ONE), W4::MIN);
        assert_eq!(W4::MAX.checked_add(W4::ONE), Err(NumericError::Overflow));
    }

    #[test]
    fn widen_from_narrow() {
        let x = D2::from_raw(-250);
        let w: WideDecimal<2> = x.into();
        assert_eq!(w.raw_value(), -250);
        assert_eq!(w, x);
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(W4::from_raw(-5).to_string(), "-0.0005");
        assert_eq!("123456.7".parse::<WideDecimal<1>>(), Ok(WideDecimal::from_raw(1_234_567)));
        assert_eq!(format!("{:?}", W4::ONE), "WideDecimal<4>(1.0000, raw=10000)");
    }
}
