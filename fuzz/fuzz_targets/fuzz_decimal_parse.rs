//! Fuzz target: decimal text parsing
//!
//! Feeds arbitrary UTF-8 into `FromStr` at several scales and asserts
//! that every accepted value prints back to text that parses to the
//! same value.
//!
//! cargo fuzz run fuzz_decimal_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use ospid::decimal::{FixedDecimal, WideDecimal};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(v) = text.parse::<FixedDecimal<1>>() {
        assert_eq!(v.to_string().parse::<FixedDecimal<1>>(), Ok(v));
    }
    if let Ok(v) = text.parse::<FixedDecimal<4>>() {
        assert_eq!(v.to_string().parse::<FixedDecimal<4>>(), Ok(v));
    }
    if let Ok(v) = text.parse::<WideDecimal<9>>() {
        assert_eq!(v.to_string().parse::<WideDecimal<9>>(), Ok(v));
    }
});
