//! Identifier newtypes for ledger entities.
//!
//! All ids are carried as opaque strings (payment-provider session ids, data
//! item ids, on-chain transaction ids, ...). The newtypes exist so that a
//! `QuoteId` can never be passed where a `TxId` is expected.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    (
        $(#[doc = $doc:literal])*
        $name:ident
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[derive(Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Identifies a top-up quote; assigned by the payment provider session.
    QuoteId
}
string_id! {
    /// Identifies the payment receipt issued when a quote is fulfilled.
    ReceiptId
}
string_id! {
    /// Identifies a chargeback raised against a payment receipt.
    ChargebackId
}
string_id! {
    /// An on-chain transaction id. Unique per token type across the pending,
    /// credited, and failed sets.
    TxId
}
string_id! {
    /// Identifies a signed data item (an upload, an approval grant, a revoke).
    DataItemId
}
string_id! {
    /// Identifies a balance reservation.
    ReservationId
}
string_id! {
    /// Identifies an ArNS purchase order.
    PurchaseId
}
string_id! {
    /// The AO message id recorded when an ArNS purchase goes out.
    MessageId
}

/// Monotonic id of an audit log row, assigned at commit time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub u64);

impl Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
