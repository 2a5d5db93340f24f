use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use winc_common::{
    address::UserAddress,
    ids::DataItemId,
    time::TimestampMs,
    winc::Winc,
};

/// A payer's earmark of winc spendable by another address. The approved
/// amount was debited from the payer's balance at creation; `used` grows as
/// reservations consume it, never past `approved`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DelegatedPaymentApproval {
    pub approval_data_item_id: DataItemId,
    pub paying_address: UserAddress,
    pub approved_address: UserAddress,
    pub approved_winc_amount: Winc,
    pub used_winc_amount: Winc,
    pub creation_date: TimestampMs,
    pub expiration_date: Option<TimestampMs>,
}

impl DelegatedPaymentApproval {
    /// The winc still spendable against this approval.
    pub fn remaining(&self) -> Winc {
        self.approved_winc_amount
            .checked_sub(&self.used_winc_amount)
            .expect("used never exceeds approved")
    }

    pub fn is_expired(&self, now: TimestampMs) -> bool {
        self.expiration_date.is_some_and(|expiry| expiry <= now)
    }
}

/// Why an approval left the active set.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub enum InactiveReason {
    Expired,
    Used,
    Revoked,
}

impl FromStr for InactiveReason {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expired" => Ok(Self::Expired),
            "used" => Ok(Self::Used),
            "revoked" => Ok(Self::Revoked),
            _ => Err(anyhow::anyhow!("unknown inactive reason: {s}")),
        }
    }
}

impl Display for InactiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Expired => "expired",
            Self::Used => "used",
            Self::Revoked => "revoked",
        };
        f.write_str(s)
    }
}

/// An approval that was fully consumed, revoked, or expired. Unspent winc
/// (`approved - used`) was refunded to the payer when the row was archived.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InactiveDelegatedPaymentApproval {
    pub approval: DelegatedPaymentApproval,
    pub inactive_reason: InactiveReason,
    pub inactive_date: TimestampMs,
    /// The data item that carried the revocation, for revoked approvals.
    pub revoke_data_item_id: Option<DataItemId>,
}
