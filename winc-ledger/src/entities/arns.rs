use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use winc_common::{
    address::UserAddress,
    ids::{MessageId, PurchaseId},
    time::TimestampMs,
    winc::Winc,
};

/// What kind of name action the purchase pays for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub enum ArNsIntent {
    LeaseName,
    PermaBuyName,
}

impl FromStr for ArNsIntent {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lease-name" => Ok(Self::LeaseName),
            "perma-buy-name" => Ok(Self::PermaBuyName),
            _ => Err(anyhow::anyhow!("unknown arns intent: {s}")),
        }
    }
}

impl Display for ArNsIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeaseName => f.write_str("lease-name"),
            Self::PermaBuyName => f.write_str("perma-buy-name"),
        }
    }
}

/// Where an ArNS purchase is in its lifecycle:
/// `quote -> pending -> success | failed`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ArNsPurchaseStatus {
    /// Priced, not yet paid for.
    Quote,
    /// Winc has been debited and the name order was sent out.
    Pending { message_id: MessageId },
    /// The external name action settled.
    Success { message_id: MessageId },
    /// The order failed; the debited winc was refunded.
    Failed {
        failed_reason: String,
        failed_date: TimestampMs,
    },
}

/// A name-service purchase that deducts winc in exchange for an external
/// token expenditure.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ArNsPurchase {
    pub purchase_id: PurchaseId,
    pub owner_address: UserAddress,
    pub name: String,
    pub intent: ArNsIntent,
    pub winc_amount: Winc,
    /// mARIO dust sent with the name order, from config.
    pub dust_mario_amount: u64,
    pub created_date: TimestampMs,
    pub status: ArNsPurchaseStatus,
    /// Which addresses covered the cost, in payer-list order.
    pub paid_by: Vec<UserAddress>,
}
