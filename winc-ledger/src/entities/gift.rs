use serde::{Deserialize, Serialize};
use winc_common::{
    address::UserAddress,
    ids::ReceiptId,
    time::TimestampMs,
    winc::Winc,
};

/// Credits purchased for an email inbox, waiting for the recipient to claim
/// them with a real chain address. Expired gifts become refundable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UnredeemedGift {
    pub payment_receipt_id: ReceiptId,
    pub recipient_email: String,
    pub gifted_winc_amount: Winc,
    pub gift_message: Option<String>,
    pub sender_email: Option<String>,
    pub creation_date: TimestampMs,
    pub expiration_date: TimestampMs,
}

impl UnredeemedGift {
    pub fn is_expired(&self, now: TimestampMs) -> bool {
        self.expiration_date <= now
    }
}

/// A gift that was claimed; `destination_address` received the credits.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RedeemedGift {
    pub gift: UnredeemedGift,
    pub destination_address: UserAddress,
    pub redemption_date: TimestampMs,
}
