//! The ledger error taxonomy.
//!
//! State and balance errors surface to callers with a mapped HTTP status;
//! everything unclassified maps to a 5xx and is logged with context by the
//! caller.

use http::StatusCode;
use winc_common::{
    address::{TokenType, UserAddress},
    ids::{DataItemId, PurchaseId, QuoteId, ReceiptId, TxId},
    winc::Winc,
};

/// Maps an error to the HTTP status the (out-of-scope) HTTP layer returns.
pub trait ToHttpStatus {
    fn to_http_status(&self) -> StatusCode;
}

/// How much was needed versus what was actually spendable, returned with
/// [`LedgerError::InsufficientBalance`] so callers can show users where the
/// shortfall is.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BalanceShortfall {
    pub needed: Winc,
    /// Spendable from the payer's own balance.
    pub available_own: Winc,
    /// Spendable from approvals received by the signer.
    pub available_received: Winc,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("user not found: {0}")]
    UserNotFound(UserAddress),

    #[error("top-up quote not found: {0}")]
    QuoteNotFound(QuoteId),

    #[error("top-up quote already exists: {0}")]
    QuoteExists(QuoteId),

    #[error("top-up quote expired: {0}")]
    QuoteExpired(QuoteId),

    #[error("payment receipt already exists for quote {0}")]
    PaymentReceiptAlreadyExists(QuoteId),

    #[error("no payment receipt exists for quote {0}")]
    PaymentReceiptNotFound(QuoteId),

    #[error(
        "insufficient balance: needed {needed} winc, \
         {available_own} own + {available_received} received",
        needed = .0.needed,
        available_own = .0.available_own,
        available_received = .0.available_received,
    )]
    InsufficientBalance(BalanceShortfall),

    #[error("delegated payment approval not found: {0}")]
    ApprovalNotFound(DataItemId),

    #[error("delegated payment approval already exists: {0}")]
    ApprovalAlreadyExists(DataItemId),

    #[error("balance reservation already exists for data item {0}")]
    ReservationExists(DataItemId),

    #[error("balance reservation not found for data item {0}")]
    ReservationNotFound(DataItemId),

    #[error("transaction {tx_id} ({token_type}) was already credited")]
    TransactionAlreadyCredited {
        tx_id: TxId,
        token_type: TokenType,
    },

    #[error("transaction {tx_id} ({token_type}) is not pending")]
    TransactionNotPending {
        tx_id: TxId,
        token_type: TokenType,
    },

    #[error("no unredeemed gift exists for receipt {0}")]
    GiftNotFound(ReceiptId),

    #[error("gift for receipt {0} was already redeemed")]
    GiftAlreadyRedeemed(ReceiptId),

    #[error("gift for receipt {0} has expired")]
    GiftExpired(ReceiptId),

    #[error("arns purchase not found: {0}")]
    PurchaseNotFound(PurchaseId),

    #[error("arns purchase {purchase_id} is {actual}, expected {expected}")]
    PurchaseInWrongState {
        purchase_id: PurchaseId,
        expected: &'static str,
        actual: &'static str,
    },
}

impl ToHttpStatus for LedgerError {
    fn to_http_status(&self) -> StatusCode {
        use LedgerError::*;
        match self {
            BadRequest(_) => StatusCode::BAD_REQUEST,
            UserNotFound(_)
            | QuoteNotFound(_)
            | QuoteExpired(_)
            | PaymentReceiptNotFound(_)
            | ApprovalNotFound(_)
            | ReservationNotFound(_)
            | GiftNotFound(_)
            | PurchaseNotFound(_) => StatusCode::NOT_FOUND,
            InsufficientBalance(_) => StatusCode::PAYMENT_REQUIRED,
            QuoteExists(_)
            | PaymentReceiptAlreadyExists(_)
            | ApprovalAlreadyExists(_)
            | ReservationExists(_)
            | TransactionAlreadyCredited { .. }
            | TransactionNotPending { .. }
            | GiftAlreadyRedeemed(_)
            | GiftExpired(_)
            | PurchaseInWrongState { .. } => StatusCode::CONFLICT,
        }
    }
}
