use serde::{Deserialize, Serialize};
use winc_common::{
    address::{UserAddress, UserAddressType},
    ids::{DataItemId, ReservationId},
    time::TimestampMs,
    winc::Winc,
};

/// One payer's share of a reservation's cost.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OverflowSpend {
    pub paying_address: UserAddress,
    pub winc_amount: Winc,
}

/// A hold of winc reserved for an upload. `overflow_spend` records which
/// payer covered each share, in the order the payer list was consumed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BalanceReservation {
    pub reservation_id: ReservationId,
    pub data_item_id: DataItemId,
    /// The upload's signer. Refunds credit this address.
    pub user_address: UserAddress,
    pub user_address_type: UserAddressType,
    pub reserved_date: TimestampMs,
    /// The final price of the reservation, after upload adjustments.
    pub reserved_winc_amount: Winc,
    /// The network (un-adjusted) price.
    pub network_winc_amount: Winc,
    pub overflow_spend: Vec<OverflowSpend>,
}
