//! `FixedDecimal<S>`: 16-bit fixed-point decimal with compile-time scale.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use super::errors::{NumericError, NumericResult};
use super::wide::WideDecimal;
use super::{div_raw, fmt_scaled, parse_scaled, pow10, rescale_raw};

/// Fixed-point decimal number with `S` decimal places.
///
/// Internally stores `value × 10^S` as an `i16`, the native integer width
/// of the controller's 8-bit core.  `S` may be at most
/// [`MAX_SCALE`](Self::MAX_SCALE); a larger scale fails to build:
///
/// ```compile_fail
/// use ospid::decimal::FixedDecimal;
/// let _ = FixedDecimal::<5>::from_raw(1);
/// ```
///
/// The constructor takes the *scaled* integer, so
/// `FixedDecimal::<2>::from_raw(100)` is `1.00`:
///
/// ```
/// use ospid::decimal::FixedDecimal;
///
/// let one = FixedDecimal::<2>::from_raw(100);
/// let ten = FixedDecimal::<2>::from_raw(1000);
/// let hundred = FixedDecimal::<1>::from_raw(1000);
///
/// assert_eq!(one, FixedDecimal::<0>::from_raw(1));
/// assert_eq!((ten * ten).rescale::<1>(), hundred);
/// assert_eq!((hundred / hundred).rescale::<0>(), one);
/// ```
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct FixedDecimal<const S: u8>(i16);

impl<const S: u8> FixedDecimal<S> {
    /// Largest scale whose unit (`10^S`) fits the 16-bit storage.
    pub const MAX_SCALE: u8 = 4;

    const VALID_SCALE: () = assert!(
        S <= Self::MAX_SCALE,
        "FixedDecimal scale exceeds the 16-bit storage bound"
    );

    /// The scale factor (10^S).
    pub const SCALE: i16 = {
        let () = Self::VALID_SCALE;
        pow10(S) as i16
    };

    pub const ZERO: Self = Self::from_raw(0);
    pub const ONE: Self = Self::from_raw(Self::SCALE);
    pub const MIN: Self = Self::from_raw(i16::MIN);
    pub const MAX: Self = Self::from_raw(i16::MAX);

    // ── Construction ──────────────────────────────────────────────

    /// Create from the scaled integer, stored verbatim.
    #[inline]
    pub const fn from_raw(raw: i16) -> Self {
        let () = Self::VALID_SCALE;
        Self(raw)
    }

    /// Rebuild from the two-byte little-endian storage layout.
    #[inline]
    pub const fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self::from_raw(i16::from_le_bytes(bytes))
    }

    // ── Accessors ─────────────────────────────────────────────────

    /// The stored scaled integer (`value × 10^S`).
    #[inline]
    pub const fn raw_value(self) -> i16 {
        self.0
    }

    /// Two-byte little-endian storage layout of the raw value.
    #[inline]
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Integer part, truncated toward zero.
    #[inline]
    pub const fn integer_part(self) -> i16 {
        self.0 / Self::SCALE
    }

    /// Fractional digits as a positive integer.
    #[inline]
    pub const fn fractional_part(self) -> u16 {
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

    /// Absolute value.  `MIN.abs()` wraps to `MIN`.
    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    // ── Checked / saturating arithmetic ───────────────────────────

    /// Checked addition.
    ///
    /// # Errors
    /// `Overflow` or `Underflow` if the sum does not fit.
    #[inline]
    pub fn checked_add(self, rhs: Self) -> NumericResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(NumericError::out_of_range(rhs.0 > 0))
    }

    /// Checked subtraction.
    ///
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

    /// Checked division; the quotient keeps this value's scale and is
    /// truncated toward zero.
    ///
    /// # Errors
    /// `DivisionByZero` if `rhs` is zero, `Overflow`/`Underflow` if the
    /// quotient does not fit.
    pub fn checked_div<const B: u8>(self, rhs: FixedDecimal<B>) -> NumericResult<Self> {
        let q = div_raw(i64::from(self.0), i64::from(rhs.0), B)
            .ok_or(NumericError::DivisionByZero)?;
        i16::try_from(q)
            .map(Self)
            .map_err(|_| NumericError::out_of_range(q > 0))
    }

    // ── Scale conversion ──────────────────────────────────────────

    /// Convert to scale `M`.
    ///
    /// Exact when `M >= S`; drops digits with truncation toward zero when
    /// `M < S`.  A widening that leaves the 16-bit range wraps; use
    /// [`checked_rescale`](Self::checked_rescale) when that is possible.
    #[inline]
    pub fn rescale<const M: u8>(self) -> FixedDecimal<M> {
        FixedDecimal::from_raw(rescale_raw(i64::from(self.0), S, M) as i16)
    }

    /// Convert to scale `M`, reporting a widening that does not fit.
    ///
    /// # Errors
    /// `Overflow` or `Underflow` if the rescaled raw leaves the 16-bit range.
    pub fn checked_rescale<const M: u8>(self) -> NumericResult<FixedDecimal<M>> {
        let raw = rescale_raw(i64::from(self.0), S, M);
        i16::try_from(raw)
            .map(FixedDecimal::from_raw)
            .map_err(|_| NumericError::out_of_range(raw > 0))
    }

    /// Lossless move into the 32-bit representation at the same scale.
    #[inline]
    pub const fn widen(self) -> WideDecimal<S> {
        WideDecimal::from_raw(self.0 as i32)
    }
}

// ── Trait implementations ─────────────────────────────────────────

impl<const S: u8> Default for FixedDecimal<S> {
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const S: u8> From<i16> for FixedDecimal<S> {
    /// Interprets the integer as the raw scaled value.
    #[inline]
    fn from(raw: i16) -> Self {
        Self::from_raw(raw)
    }
}

impl<const S: u8> Eq for FixedDecimal<S> {}

impl<const S: u8> Ord for FixedDecimal<S> {
    #[inline]
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<const S: u8> Hash for FixedDecimal<S> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<const S: u8> Neg for FixedDecimal<S> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

// Same-scale only; overflow wraps.
impl<const S: u8> Add for FixedDecimal<S> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl<const S: u8> Sub for FixedDecimal<S> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl<const S: u8> AddAssign for FixedDecimal<S> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const S: u8> SubAssign for FixedDecimal<S> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// `FixedDecimal<A> * FixedDecimal<B> = WideDecimal<A + B>`, exact.
///
/// Generic const arithmetic is not available on stable, so every valid
/// scale pair is listed.
macro_rules! impl_mul {
    ($(($a:literal, $b:literal) => $c:literal),* $(,)?) => {$(
        impl Mul<FixedDecimal<$b>> for FixedDecimal<$a> {
            type Output = WideDecimal<$c>;

            #[inline]
            fn mul(self, rhs: FixedDecimal<$b>) -> WideDecimal<$c> {
                WideDecimal::from_raw(i32::from(self.0) * i32::from(rhs.0))
            }
        }
    )*};
}

impl_mul! {
    (0, 0) => 0, (0, 1) => 1, (0, 2) => 2, (0, 3) => 3, (0, 4) => 4,
    (1, 0) => 1, (1, 1) => 2, (1, 2) => 3, (1, 3) => 4, (1, 4) => 5,
    (2, 0) => 2, (2, 1) => 3, (2, 2) => 4, (2, 3) => 5, (2, 4) => 6,
    (3, 0) => 3, (3, 1) => 4, (3, 2) => 5, (3, 3) => 6, (3, 4) => 7,
    (4, 0) => 4, (4, 1) => 5, (4, 2) => 6, (4, 3) => 7, (4, 4) => 8,
}

/// Quotient at the dividend's scale, truncated toward zero.
///
/// A quotient outside the 16-bit range wraps like the other operators
/// (`MIN / -1` is `MIN`); use [`checked_div`](FixedDecimal::checked_div)
/// when that is possible.
///
/// # Panics
/// Panics with `division by zero` if `rhs` is zero.
impl<const A: u8, const B: u8> Div<FixedDecimal<B>> for FixedDecimal<A> {
    type Output = Self;

    #[inline]
    fn div(self, rhs: FixedDecimal<B>) -> Self {
        match div_raw(i64::from(self.0), i64::from(rhs.0), B) {
            Some(q) => Self(q as i16),
            None => panic!("{}", NumericError::DivisionByZero),
        }
    }
}

/// Keeps the left operand's scale: `a *= b` stores `(a * b).rescale::<A>()`.
impl<const A: u8, const B: u8> MulAssign<FixedDecimal<B>> for FixedDecimal<A> {
    #[inline]
    fn mul_assign(&mut self, rhs: FixedDecimal<B>) {
        let product = i64::from(self.0) * i64::from(rhs.0);
        self.0 = rescale_raw(product, A + B, A) as i16;
    }
}

/// # Panics
/// Panics with `division by zero` if `rhs` is zero.
impl<const A: u8, const B: u8> DivAssign<FixedDecimal<B>> for FixedDecimal<A> {
    #[inline]
    fn div_assign(&mut self, rhs: FixedDecimal<B>) {
        *self = *self / rhs;
    }
}

// ── Display and parsing ───────────────────────────────────────────

impl<const S: u8> fmt::Debug for FixedDecimal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedDecimal<{}>({}, raw={})", S, self, self.0)
    }
}

impl<const S: u8> fmt::Display for FixedDecimal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_scaled(f, i64::from(self.0), S)
    }
}

impl<const S: u8> FromStr for FixedDecimal<S> {
    type Err = NumericError;

    /// Parse decimal text such as `"12.5"` or `"-0.05"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = parse_scaled(s, S)?;
        i16::try_from(raw)
            .map(Self::from_raw)
            .map_err(|_| NumericError::out_of_range(raw > 0))
    }
}
