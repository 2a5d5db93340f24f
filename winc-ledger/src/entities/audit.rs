use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use winc_common::{
    address::UserAddress,
    ids::AuditId,
    time::TimestampMs,
    winc::SignedWinc,
};

/// Why a user's balance changed (or why a zero-delta marker row was
/// written, e.g. account creation).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[derive(SerializeDisplay, DeserializeFromStr)]
#[cfg_attr(
    any(test, feature = "test-utils"),
    derive(proptest_derive::Arbitrary)
)]
pub enum AuditChangeReason {
    Upload,
    ApprovedUpload,
    Payment,
    CryptoPayment,
    BypassedPayment,
    AccountCreation,
    BypassedAccountCreation,
    Chargeback,
    Refund,
    RefundedUpload,
    GiftedPayment,
    BypassedGiftedPayment,
    GiftedPaymentRedemption,
    GiftedAccountCreation,
    DelegatedPaymentApproval,
    DelegatedPaymentRevoke,
    DelegatedPaymentExpired,
    ArnsAccountCreation,
    ArnsPurchaseOrder,
    ApprovedArnsPurchaseOrder,
    ArnsPurchaseOrderFailed,
}

impl AuditChangeReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::ApprovedUpload => "approved_upload",
            Self::Payment => "payment",
            Self::CryptoPayment => "crypto_payment",
            Self::BypassedPayment => "bypassed_payment",
            Self::AccountCreation => "account_creation",
            Self::BypassedAccountCreation => "bypassed_account_creation",
            Self::Chargeback => "chargeback",
            Self::Refund => "refund",
            Self::RefundedUpload => "refunded_upload",
            Self::GiftedPayment => "gifted_payment",
            Self::BypassedGiftedPayment => "bypassed_gifted_payment",
            Self::GiftedPaymentRedemption => "gifted_payment_redemption",
            Self::GiftedAccountCreation => "gifted_account_creation",
            Self::DelegatedPaymentApproval => "delegated_payment_approval",
            Self::DelegatedPaymentRevoke => "delegated_payment_revoke",
            Self::DelegatedPaymentExpired => "delegated_payment_expired",
            Self::ArnsAccountCreation => "arns_account_creation",
            Self::ArnsPurchaseOrder => "arns_purchase_order",
            Self::ApprovedArnsPurchaseOrder => "approved_arns_purchase_order",
            Self::ArnsPurchaseOrderFailed => "arns_purchase_order_failed",
        }
    }
}

impl FromStr for AuditChangeReason {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [AuditChangeReason; 21] = [
            AuditChangeReason::Upload,
            AuditChangeReason::ApprovedUpload,
            AuditChangeReason::Payment,
            AuditChangeReason::CryptoPayment,
            AuditChangeReason::BypassedPayment,
            AuditChangeReason::AccountCreation,
            AuditChangeReason::BypassedAccountCreation,
            AuditChangeReason::Chargeback,
            AuditChangeReason::Refund,
            AuditChangeReason::RefundedUpload,
            AuditChangeReason::GiftedPayment,
            AuditChangeReason::BypassedGiftedPayment,
            AuditChangeReason::GiftedPaymentRedemption,
            AuditChangeReason::GiftedAccountCreation,
            AuditChangeReason::DelegatedPaymentApproval,
            AuditChangeReason::DelegatedPaymentRevoke,
            AuditChangeReason::DelegatedPaymentExpired,
            AuditChangeReason::ArnsAccountCreation,
            AuditChangeReason::ArnsPurchaseOrder,
            AuditChangeReason::ApprovedArnsPurchaseOrder,
            AuditChangeReason::ArnsPurchaseOrderFailed,
        ];
        ALL.into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown change reason: {s}"))
    }
}

impl Display for AuditChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only audit log. Rows are never updated nor
/// deleted; the running sum of `signed_winc_delta` for a user equals that
/// user's current balance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: AuditId,
    /// The account the delta applies to. For gifted payments this is the
    /// recipient email, which has no user row until redemption.
    pub user_address: UserAddress,
    pub signed_winc_delta: SignedWinc,
    pub change_reason: AuditChangeReason,
    /// The originating entity (quote id, tx id, data item id, ...).
    pub change_id: Option<String>,
    pub audit_date: TimestampMs,
}

#[cfg(test)]
mod test {
    use winc_common::test_utils::roundtrip;

    use super::*;

    #[test]
    fn change_reason_roundtrips() {
        roundtrip::fromstr_display_roundtrip_proptest::<AuditChangeReason>();
        roundtrip::json_string_roundtrip_proptest::<AuditChangeReason>();
    }
}
