use serde::{Deserialize, Serialize};
use winc_common::{
    address::{UserAddress, UserAddressType},
    time::TimestampMs,
    winc::SignedWinc,
};

/// A ledger account, created on first credit (or by admin tooling).
///
/// The balance is signed: reservations can never push it below zero, but a
/// chargeback may.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub address: UserAddress,
    pub address_type: UserAddressType,
    pub creation_date: TimestampMs,
    pub winc_balance: SignedWinc,
    /// Free-form promotional state (e.g. which welcome promos were consumed).
    pub promotional_info: serde_json::Value,
}

impl User {
    pub fn new(
        address: UserAddress,
        address_type: UserAddressType,
        creation_date: TimestampMs,
    ) -> Self {
        Self {
            address,
            address_type,
            creation_date,
            winc_balance: SignedWinc::zero(),
            promotional_info: serde_json::Value::Null,
        }
    }
}
