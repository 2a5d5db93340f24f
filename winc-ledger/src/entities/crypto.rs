use serde::{Deserialize, Serialize};
use winc_common::{
    address::{DestinationType, TokenType, UserAddress},
    ids::TxId,
    time::TimestampMs,
    winc::Winc,
};

/// An observed on-chain payment awaiting confirmation. At most one row per
/// `(tx_id, token_type)` exists across the pending, credited, and failed
/// sets combined, which makes the credit pipeline idempotent under retries.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PendingPaymentTransaction {
    pub tx_id: TxId,
    pub token_type: TokenType,
    /// Quantity in the token's base units (winston, wei, lamports, ukyve...).
    pub quantity: Winc,
    pub winc_amount: Winc,
    pub destination_address: UserAddress,
    pub destination_address_type: DestinationType,
    pub created_date: TimestampMs,
}

/// A pending transaction that reached its confirmation threshold and was
/// credited to the destination.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CreditedPaymentTransaction {
    pub transaction: PendingPaymentTransaction,
    pub credited_date: TimestampMs,
    pub block_height: u64,
}

/// A pending transaction that will never be credited.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FailedPaymentTransaction {
    pub transaction: PendingPaymentTransaction,
    pub failed_reason: String,
    pub failed_date: TimestampMs,
}
