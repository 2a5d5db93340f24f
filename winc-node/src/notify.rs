//! Best-effort event sinks.
//!
//! Slack messages and emails hang off these events in the deployment; here
//! they are fire-and-forget observers that must never block or fail a
//! ledger commit, so the trait is synchronous and infallible.

use std::sync::Arc;

use tracing::info;
use winc_common::{
    address::{TokenType, UserAddress},
    ids::{QuoteId, TxId},
    winc::Winc,
};

#[derive(Clone, Debug)]
pub enum PaymentEvent {
    QuoteFulfilled {
        quote_id: QuoteId,
        destination: UserAddress,
        winc_amount: Winc,
    },
    CryptoPaymentCredited {
        tx_id: TxId,
        token_type: TokenType,
        destination: UserAddress,
        winc_amount: Winc,
    },
    GiftExpired {
        recipient_email: String,
        winc_amount: Winc,
    },
}

pub trait PaymentEventSink: Send + Sync {
    fn notify(&self, event: PaymentEvent);
}

pub type SharedSink = Arc<dyn PaymentEventSink>;

/// Logs every event; the default sink.
pub struct TracingSink;

impl PaymentEventSink for TracingSink {
    fn notify(&self, event: PaymentEvent) {
        info!(?event, "payment event");
    }
}
