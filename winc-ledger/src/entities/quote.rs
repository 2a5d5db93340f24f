use std::fmt::{self, Display};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use winc_common::{
    address::{DestinationType, UserAddress},
    ids::{ChargebackId, QuoteId, ReceiptId},
    time::TimestampMs,
    winc::Winc,
};

/// A fiat currency code, lowercase ("usd", "eur", ...). The set of accepted
/// currencies is the payment provider's concern.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyType(String);

impl CurrencyType {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The external fiat payment provider a quote was opened with.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentProvider(String);

impl PaymentProvider {
    pub fn new(provider: impl Into<String>) -> Self {
        Self(provider.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A promise to credit `winc_amount` to `destination_address` once the
/// provider confirms payment of `payment_amount`. Immutable once created;
/// state transitions move it into [`PaymentReceipt`] or [`FailedTopUpQuote`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TopUpQuote {
    pub quote_id: QuoteId,
    pub destination_address: UserAddress,
    pub destination_address_type: DestinationType,
    /// What the provider will actually charge, after payment adjustments.
    pub payment_amount: Decimal,
    /// The pre-adjustment charge, kept for display and audit.
    pub quoted_payment_amount: Decimal,
    pub currency_type: CurrencyType,
    pub winc_amount: Winc,
    pub provider: PaymentProvider,
    pub creation_date: TimestampMs,
    pub expiration_date: TimestampMs,
    /// Carried when the destination is an email inbox.
    pub gift_message: Option<String>,
}

impl TopUpQuote {
    pub fn is_expired(&self, now: TimestampMs) -> bool {
        self.expiration_date <= now
    }
}

/// Confirmation that a quote's payment settled and credit was issued.
/// Exactly one receipt may exist per quote.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub quote: TopUpQuote,
    pub receipt_id: ReceiptId,
    pub receipt_date: TimestampMs,
    /// The payer's email, forwarded by the provider for gift receipts.
    pub sender_email: Option<String>,
}

/// A quote that will never be fulfilled.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FailedTopUpQuote {
    pub quote: TopUpQuote,
    pub failed_reason: String,
    pub quote_failed_date: TimestampMs,
}

/// A provider-initiated reversal of a settled payment. The destination is
/// debited by the receipt's `winc_amount`, which may push its balance
/// negative.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChargebackReceipt {
    pub receipt: PaymentReceipt,
    pub chargeback_id: ChargebackId,
    pub chargeback_reason: String,
    pub chargeback_date: TimestampMs,
}
