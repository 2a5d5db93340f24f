use std::fmt::{self, Display};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use winc_common::{
    bytes::ByteCount,
    time::TimestampMs,
    winc::{SignedWinc, Winc},
};

/// Identifies an adjustment catalog entry.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(String);

impl CatalogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a catalog entry transforms the running amount.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub enum AdjustmentOperator {
    /// Add `operator_magnitude` winc (negative magnitudes are discounts).
    Add,
    /// Multiply by `operator_magnitude` (e.g. `0.8` is a 20% discount).
    Multiply,
}

impl FromStr for AdjustmentOperator {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "multiply" => Ok(Self::Multiply),
            _ => Err(anyhow::anyhow!("unknown adjustment operator: {s}")),
        }
    }
}

impl Display for AdjustmentOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Multiply => f.write_str("multiply"),
        }
    }
}

/// Subtype-specific constraints on when a catalog entry applies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AdjustmentCatalogKind {
    /// Applies to upload reservations.
    Upload {
        /// Skip uploads below this size (e.g. free-tier chunks).
        byte_count_threshold: Option<ByteCount>,
        /// Cap on total winc this catalog may discount per user per
        /// interval.
        winc_limitation: Option<Winc>,
    },
    /// Applies to fiat top-up quotes.
    Payment {
        /// An exclusive catalog suppresses lower-priority entries.
        exclusive: bool,
    },
    /// A promo code redeemable once per user.
    SingleUseCodePayment {
        code: String,
        /// An exclusive catalog suppresses lower-priority entries.
        exclusive: bool,
    },
}

/// A priceable adjustment rule (subsidy, surcharge, or promotion).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentCatalog {
    pub catalog_id: CatalogId,
    pub name: String,
    pub start_date: TimestampMs,
    pub end_date: Option<TimestampMs>,
    /// Catalogs apply in ascending priority order.
    pub priority: u32,
    pub operator: AdjustmentOperator,
    pub operator_magnitude: Decimal,
    pub kind: AdjustmentCatalogKind,
}

impl AdjustmentCatalog {
    pub fn is_active(&self, now: TimestampMs) -> bool {
        self.start_date <= now
            && self.end_date.is_none_or(|end| now < end)
    }
}

/// A catalog entry actually applied to an upload reservation, recording the
/// signed winc delta it contributed (negative for discounts).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub catalog_id: CatalogId,
    pub adjusted_amount: SignedWinc,
}

/// A catalog entry actually applied to a top-up quote, recording the signed
/// fiat delta it contributed (negative for discounts).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedPaymentAdjustment {
    pub catalog_id: CatalogId,
    pub adjusted_payment_amount: Decimal,
}
