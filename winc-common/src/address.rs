//! Address and token types for the supported chains.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// A native address on one of the supported chains, carried as an opaque
/// string. Address validity is the concern of the signature-verification
/// layer; the ledger only needs uniqueness.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserAddress(String);

impl UserAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserAddress {
    fn from(address: &str) -> Self {
        Self(address.to_owned())
    }
}

impl Display for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of chain an address belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(SerializeDisplay, DeserializeFromStr)]
#[cfg_attr(
    any(test, feature = "test-utils"),
    derive(proptest_derive::Arbitrary)
)]
pub enum UserAddressType {
    Arweave,
    Ario,
    Solana,
    Ed25519,
    Ethereum,
    Kyve,
    Matic,
    Pol,
    BaseEth,
}

impl FromStr for UserAddressType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arweave" => Ok(Self::Arweave),
            "ario" => Ok(Self::Ario),
            "solana" => Ok(Self::Solana),
            "ed25519" => Ok(Self::Ed25519),
            "ethereum" => Ok(Self::Ethereum),
            "kyve" => Ok(Self::Kyve),
            "matic" => Ok(Self::Matic),
            "pol" => Ok(Self::Pol),
            "base-eth" => Ok(Self::BaseEth),
            _ => Err(anyhow!("unknown address type: {s}")),
        }
    }
}

impl Display for UserAddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Arweave => "arweave",
            Self::Ario => "ario",
            Self::Solana => "solana",
            Self::Ed25519 => "ed25519",
            Self::Ethereum => "ethereum",
            Self::Kyve => "kyve",
            Self::Matic => "matic",
            Self::Pol => "pol",
            Self::BaseEth => "base-eth",
        };
        f.write_str(s)
    }
}

/// Where a top-up quote's credits land: a chain address, or an email inbox
/// (a gift, redeemed later to a concrete address).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(SerializeDisplay, DeserializeFromStr)]
#[cfg_attr(
    any(test, feature = "test-utils"),
    derive(proptest_derive::Arbitrary)
)]
pub enum DestinationType {
    User(UserAddressType),
    Email,
}

impl DestinationType {
    pub fn is_email(self) -> bool {
        matches!(self, Self::Email)
    }
}

impl FromStr for DestinationType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            other => UserAddressType::from_str(other).map(Self::User),
        }
    }
}

impl Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(address_type) => Display::fmt(address_type, f),
            Self::Email => f.write_str("email"),
        }
    }
}

/// The token a crypto payment transaction is denominated in. Keys the
/// gateway map and the pending-transaction uniqueness fingerprint.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(SerializeDisplay, DeserializeFromStr)]
#[cfg_attr(
    any(test, feature = "test-utils"),
    derive(proptest_derive::Arbitrary)
)]
pub enum TokenType {
    Arweave,
    Ario,
    Ethereum,
    BaseEth,
    Solana,
    Kyve,
    Matic,
    Pol,
}

impl TokenType {
    pub const ALL: [Self; 8] = [
        Self::Arweave,
        Self::Ario,
        Self::Ethereum,
        Self::BaseEth,
        Self::Solana,
        Self::Kyve,
        Self::Matic,
        Self::Pol,
    ];

    /// The address type of a wallet paying in this token.
    pub fn address_type(self) -> UserAddressType {
        match self {
            Self::Arweave => UserAddressType::Arweave,
            Self::Ario => UserAddressType::Ario,
            Self::Ethereum => UserAddressType::Ethereum,
            Self::BaseEth => UserAddressType::BaseEth,
            Self::Solana => UserAddressType::Solana,
            Self::Kyve => UserAddressType::Kyve,
            Self::Matic => UserAddressType::Matic,
            Self::Pol => UserAddressType::Pol,
        }
    }
}

impl FromStr for TokenType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arweave" => Ok(Self::Arweave),
            "ario" => Ok(Self::Ario),
            "ethereum" => Ok(Self::Ethereum),
            "base-eth" => Ok(Self::BaseEth),
            "solana" => Ok(Self::Solana),
            "kyve" => Ok(Self::Kyve),
            "matic" => Ok(Self::Matic),
            "pol" => Ok(Self::Pol),
            _ => Err(anyhow!("unknown token type: {s}")),
        }
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Arweave => "arweave",
            Self::Ario => "ario",
            Self::Ethereum => "ethereum",
            Self::BaseEth => "base-eth",
            Self::Solana => "solana",
            Self::Kyve => "kyve",
            Self::Matic => "matic",
            Self::Pol => "pol",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod test {
    use crate::test_utils::roundtrip;

    use super::*;

    #[test]
    fn enums_roundtrip() {
        roundtrip::fromstr_display_roundtrip_proptest::<UserAddressType>();
        roundtrip::fromstr_display_roundtrip_proptest::<DestinationType>();
        roundtrip::fromstr_display_roundtrip_proptest::<TokenType>();
        roundtrip::json_string_roundtrip_proptest::<UserAddressType>();
        roundtrip::json_string_roundtrip_proptest::<DestinationType>();
        roundtrip::json_string_roundtrip_proptest::<TokenType>();
    }
}
