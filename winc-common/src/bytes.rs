//! [`PositiveFiniteInteger`] and [`ByteCount`].

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::constants::CHUNK_BYTE_SIZE;

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum IntegerError {
    #[error("value must be non-negative")]
    Negative,
    #[error("value must be finite")]
    NotFinite,
    #[error("value is not an integer in the 64-bit range")]
    OutOfRange,
}

/// A non-negative integer in the 64-bit signed range.
///
/// The float constructor rejects NaN, infinities, and fractional values, so a
/// `PositiveFiniteInteger` obtained from untrusted input is always a plain
/// whole number.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub struct PositiveFiniteInteger(i64);

impl PositiveFiniteInteger {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i64) -> Result<Self, IntegerError> {
        if value < 0 {
            Err(IntegerError::Negative)
        } else {
            Ok(Self(value))
        }
    }

    pub fn try_from_f64(value: f64) -> Result<Self, IntegerError> {
        if value.is_nan() || value.is_infinite() {
            return Err(IntegerError::NotFinite);
        }
        if value.is_sign_negative() {
            return Err(IntegerError::Negative);
        }
        if value.fract() != 0.0 || value > i64::MAX as f64 {
            return Err(IntegerError::OutOfRange);
        }
        Ok(Self(value as i64))
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn as_u64(self) -> u64 {
        u64::try_from(self.0).expect("non-negative invariant")
    }
}

impl From<u32> for PositiveFiniteInteger {
    fn from(value: u32) -> Self {
        Self(i64::from(value))
    }
}

impl FromStr for PositiveFiniteInteger {
    type Err = IntegerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = i64::from_str(s).map_err(|_| IntegerError::OutOfRange)?;
        Self::new(value)
    }
}

impl Display for PositiveFiniteInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A byte count, e.g. the size of a data item to be uploaded.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub struct ByteCount(PositiveFiniteInteger);

impl ByteCount {
    pub fn new(bytes: i64) -> Result<Self, IntegerError> {
        PositiveFiniteInteger::new(bytes).map(Self)
    }

    pub fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    /// Rounds up to the next multiple of the 256 KiB chunk size. Uploads are
    /// priced per chunk, so `0` rounds to `0` and everything else rounds to a
    /// full chunk boundary. Saturates at the largest representable chunk
    /// multiple.
    pub fn round_to_chunk_size(self) -> Self {
        const MAX_CHUNKS: u64 = i64::MAX as u64 / CHUNK_BYTE_SIZE;
        let bytes = self.0.as_u64();
        let chunks = bytes.div_ceil(CHUNK_BYTE_SIZE).min(MAX_CHUNKS);
        Self::new((chunks * CHUNK_BYTE_SIZE) as i64)
            .expect("a bounded chunk multiple fits in range")
    }
}

impl FromStr for ByteCount {
    type Err = IntegerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PositiveFiniteInteger::from_str(s).map(Self)
    }
}

impl Display for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod test {
    use proptest::{prop_assert, prop_assert_eq, proptest};

    use super::*;

    #[test]
    fn rejects_bad_floats() {
        assert_eq!(
            PositiveFiniteInteger::try_from_f64(f64::NAN),
            Err(IntegerError::NotFinite),
        );
        assert_eq!(
            PositiveFiniteInteger::try_from_f64(f64::INFINITY),
            Err(IntegerError::NotFinite),
        );
        assert_eq!(
            PositiveFiniteInteger::try_from_f64(-1.0),
            Err(IntegerError::Negative),
        );
        assert_eq!(
            PositiveFiniteInteger::try_from_f64(1.5),
            Err(IntegerError::OutOfRange),
        );
        assert_eq!(
            PositiveFiniteInteger::try_from_f64(42.0).unwrap().as_i64(),
            42,
        );
    }

    #[test]
    fn chunk_rounding_properties() {
        // Bound the input so the rounded value can't overflow i64.
        proptest!(|(bytes in 0i64..=(i64::MAX / 2))| {
            let count = ByteCount::new(bytes).unwrap();
            let rounded = count.round_to_chunk_size();

            prop_assert!(rounded >= count);
            prop_assert_eq!(rounded.as_u64() % CHUNK_BYTE_SIZE, 0);
            prop_assert!(rounded.as_u64() - count.as_u64() < CHUNK_BYTE_SIZE);
        });
    }

    #[test]
    fn chunk_rounding_boundaries() {
        let cases = [
            (0, 0),
            (1, CHUNK_BYTE_SIZE),
            (CHUNK_BYTE_SIZE - 1, CHUNK_BYTE_SIZE),
            (CHUNK_BYTE_SIZE, CHUNK_BYTE_SIZE),
            (CHUNK_BYTE_SIZE + 1, 2 * CHUNK_BYTE_SIZE),
        ];
        for (bytes, expected) in cases {
            let rounded =
                ByteCount::new(bytes as i64).unwrap().round_to_chunk_size();
            assert_eq!(rounded.as_u64(), expected, "bytes={bytes}");
        }
    }
}
