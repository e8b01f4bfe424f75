//! Value comparison across scales and storage widths.
//!
//! `FixedDecimal::<0>::from_raw(1) == FixedDecimal::<4>::from_raw(10_000)`:
//! both sides are normalized to the larger scale in 64-bit arithmetic
//! before comparing, so no scale pair can overflow.

use core::cmp::Ordering;

use super::compare_scaled;
use super::fixed::FixedDecimal;
use super::wide::WideDecimal;

macro_rules! impl_cross_cmp {
    ($($lhs:ident vs $rhs:ident),* $(,)?) => {$(
        impl<const A: u8, const B: u8> PartialEq<$rhs<B>> for $lhs<A> {
            #[inline]
            fn eq(&self, other: &$rhs<B>) -> bool {
                compare_scaled(
                    i64::from(self.raw_value()),
                    A,
                    i64::from(other.raw_value()),
                    B,
                ) == Ordering::Equal
            }
        }

        impl<const A: u8, const B: u8> PartialOrd<$rhs<B>> for $lhs<A> {
            #[inline]
            fn partial_cmp(&self, other: &$rhs<B>) -> Option<Ordering> {
                Some(compare_scaled(
                    i64::from(self.raw_value()),
                    A,
                    i64::from(other.raw_value()),
                    B,
                ))
            }
        }
    )*};
}

impl_cross_cmp! {
    FixedDecimal vs FixedDecimal,
    FixedDecimal vs WideDecimal,
    WideDecimal vs FixedDecimal,
    WideDecimal vs WideDecimal,
}
