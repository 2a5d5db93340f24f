//! Millisecond unix timestamps.

use std::{
    fmt::{self, Display},
    ops::{Add, Sub},
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{de, Deserialize, Deserializer, Serialize};

/// The number of milliseconds since the unix epoch.
///
/// Internally a non-negative [`i64`], which eases interoperability with
/// stores and wire formats that lack unsigned integers, and still reaches
/// roughly 292 million years past the epoch.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct TimestampMs(i64);

impl TimestampMs {
    pub const EPOCH: Self = Self(0);

    /// The current [`SystemTime`], as a [`TimestampMs`].
    ///
    /// Panics if the system clock is before 1970.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the unix epoch")
            .as_millis();
        Self(i64::try_from(millis).expect("292 million years from now"))
    }

    pub fn from_millis(millis: i64) -> Option<Self> {
        (millis >= 0).then_some(Self(millis))
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    /// Saturating add; timestamps never wrap.
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// The duration from `earlier` to `self`, or zero if `self` is earlier.
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        let millis = self.0.saturating_sub(earlier.0);
        if millis <= 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(millis as u64)
        }
    }
}

impl Add<Duration> for TimestampMs {
    type Output = Self;
    fn add(self, duration: Duration) -> Self::Output {
        self.saturating_add(duration)
    }
}

impl Sub for TimestampMs {
    type Output = Duration;
    fn sub(self, earlier: Self) -> Duration {
        self.saturating_duration_since(earlier)
    }
}

/// Enforces that the inner [`i64`] is non-negative.
impl<'de> Deserialize<'de> for TimestampMs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Self::from_millis(value).ok_or_else(|| {
            de::Error::invalid_value(
                de::Unexpected::Signed(value),
                &"unix timestamp must be non-negative",
            )
        })
    }
}

impl FromStr for TimestampMs {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let millis = i64::from_str(s)?;
        Self::from_millis(millis)
            .ok_or_else(|| anyhow::anyhow!("timestamp must be non-negative"))
    }
}

impl Display for TimestampMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[cfg(any(test, feature = "test-utils"))]
mod arbitrary_impl {
    use proptest::{
        arbitrary::Arbitrary,
        strategy::{BoxedStrategy, Strategy},
    };

    use super::*;

    impl Arbitrary for TimestampMs {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;
        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            (0..i64::MAX).prop_map(TimestampMs).boxed()
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::test_utils::roundtrip;

    use super::*;

    #[test]
    fn timestamp_roundtrip() {
        roundtrip::json_string_roundtrip_proptest::<TimestampMs>();
        roundtrip::fromstr_display_roundtrip_proptest::<TimestampMs>();
    }

    #[test]
    fn deserialize_enforces_nonnegative() {
        assert_eq!(
            serde_json::from_str::<TimestampMs>("42").unwrap().as_i64(),
            42,
        );
        assert!(serde_json::from_str::<TimestampMs>("-42").is_err());
    }

    #[test]
    fn saturating_arithmetic() {
        let t0 = TimestampMs::from_millis(1_000).unwrap();
        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(t1.as_i64(), 2_000);
        assert_eq!(t1 - t0, Duration::from_secs(1));
        assert_eq!(t0 - t1, Duration::ZERO);

        let max = TimestampMs::from_millis(i64::MAX).unwrap();
        assert_eq!((max + Duration::from_secs(1)).as_i64(), i64::MAX);
    }
}
