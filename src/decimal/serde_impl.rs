//! Serde support.
//!
//! Human-readable formats (JSON, TOML) carry the decimal text, so a config
//! file reads `"setpoint": "120.5"`.  Binary formats (postcard in NVS)
//! carry the two little-endian storage bytes and nothing else.

use core::fmt;
use core::marker::PhantomData;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::fixed::FixedDecimal;

impl<const S: u8> Serialize for FixedDecimal<S> {
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.to_le_bytes().serialize(serializer)
        }
    }
}

impl<'de, const S: u8> Deserialize<'de> for FixedDecimal<S> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(DecimalVisitor::<S>(PhantomData))
        } else {
            <[u8; 2]>::deserialize(deserializer).map(Self::from_le_bytes)
        }
    }
}

struct DecimalVisitor<const S: u8>(PhantomData<FixedDecimal<S>>);

impl<const S: u8> Visitor<'_> for DecimalVisitor<S> {
    type Value = FixedDecimal<S>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a decimal with at most {S} fractional digits")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    // Whole numbers written without quotes.
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        i16::try_from(v)
            .ok()
            .and_then(|whole| whole.checked_mul(FixedDecimal::<S>::SCALE))
            .map(FixedDecimal::from_raw)
            .ok_or_else(|| E::custom(format_args!("{v} is out of range")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map_err(|_| E::custom(format_args!("{v} is out of range")))
            .and_then(|v| self.visit_i64(v))
    }
}
