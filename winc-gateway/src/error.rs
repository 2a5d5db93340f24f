//! Gateway error taxonomy.
//!
//! `TransactionNotMined` and `TransactionNotAPayment` are terminal verdicts
//! about the transaction itself; the poller surfaces them immediately.
//! Everything else is treated as transient and retried.

use winc_common::ids::TxId;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The transaction never appeared within the polling budget.
    #[error("payment transaction not found: {0}")]
    TransactionNotFound(TxId),

    /// The chain rejected the transaction (e.g. non-zero cosmos tx code).
    #[error("payment transaction not mined: {0}")]
    TransactionNotMined(TxId),

    /// The transaction exists but is not a payment we can credit.
    #[error("transaction is not a payment transaction: {0}")]
    TransactionNotAPayment(TxId),

    /// The caller's deadline or shutdown fired mid-poll.
    #[error("gateway polling was cancelled")]
    Cancelled,

    #[error("gateway request failed")]
    Http(#[from] reqwest::Error),

    #[error("unexpected gateway response: {0}")]
    BadResponse(String),
}

impl GatewayError {
    /// Whether retrying can change the outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TransactionNotMined(_)
                | Self::TransactionNotAPayment(_)
                | Self::Cancelled,
        )
    }
}
