//! Serde support for [`Decimal`], exchanging values in the canonical
//! sixteen byte little-endian layout of [`Decimal::serialize`].
//! Deserialization rejects byte patterns that violate the scale or
//! reserved-bit invariants.

use crate::constants::{MAX_PRECISION, SCALE_MASK, SIGN_MASK};
use crate::decimal::Decimal;
use core::fmt;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&Decimal::serialize(self))
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_bytes(DecimalVisitor)
    }
}

struct DecimalVisitor;

impl<'de> de::Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("sixteen bytes of a little-endian packed decimal")
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Decimal, E>
    where
        E: de::Error,
    {
        if v.len() != 16 {
            return Err(E::invalid_length(v.len(), &self));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(v);
        validated(Decimal::deserialize(bytes))
    }

    // Formats without a native byte type hand the array over element by
    // element.
    fn visit_seq<A>(self, mut seq: A) -> Result<Decimal, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut bytes = [0u8; 16];
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = match seq.next_element()? {
                Some(b) => b,
                None => return Err(de::Error::invalid_length(index, &self)),
            };
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(17, &self));
        }
        validated(Decimal::deserialize(bytes))
    }
}

fn validated<E: de::Error>(value: Decimal) -> Result<Decimal, E> {
    if value.flags & !(SIGN_MASK | SCALE_MASK) != 0 {
        return Err(E::custom("decimal has reserved flag bits set"));
    }
    if value.scale() > MAX_PRECISION {
        return Err(E::custom("decimal scale exceeds the maximum precision"));
    }
    Ok(value)
}
