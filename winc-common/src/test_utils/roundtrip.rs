//! Quickly create serialization roundtrip proptests.

use std::{fmt::Debug, str::FromStr};

use proptest::{arbitrary::Arbitrary, prop_assert_eq, proptest};
use serde::{de::DeserializeOwned, Serialize};

/// Proptest that `T` roundtrips through its JSON representation.
pub fn json_string_roundtrip_proptest<T>()
where
    T: Arbitrary + Debug + PartialEq + Serialize + DeserializeOwned,
{
    proptest!(|(value1: T)| {
        let json1 = serde_json::to_string(&value1).unwrap();
        let value2 = serde_json::from_str::<T>(&json1).unwrap();
        let json2 = serde_json::to_string(&value2).unwrap();
        prop_assert_eq!(&value1, &value2);
        prop_assert_eq!(&json1, &json2);
    });
}

/// Proptest that `T`'s [`FromStr`] impl inverts its [`Display`] impl.
///
/// [`Display`]: std::fmt::Display
pub fn fromstr_display_roundtrip_proptest<T>()
where
    T: Arbitrary + Debug + PartialEq + FromStr + std::fmt::Display,
    <T as FromStr>::Err: Debug,
{
    proptest!(|(value1: T)| {
        let value2 = T::from_str(&value1.to_string()).unwrap();
        prop_assert_eq!(&value1, &value2);
    });
}
