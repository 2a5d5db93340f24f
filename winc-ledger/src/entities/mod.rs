//! Ledger entity types.
//!
//! Entities mirror the persisted tables. Lifecycle transitions move rows
//! between sibling types (quote -> receipt -> chargeback receipt; pending ->
//! credited | failed transaction; active -> inactive approval) rather than
//! mutating rows in place, so each type captures exactly one state.

mod adjustment;
mod approval;
mod arns;
mod audit;
mod crypto;
mod gift;
mod quote;
mod reservation;
mod user;

pub use adjustment::{
    AdjustmentCatalog, AdjustmentCatalogKind, AdjustmentOperator,
    AppliedAdjustment, AppliedPaymentAdjustment, CatalogId,
};
pub use approval::{
    DelegatedPaymentApproval, InactiveDelegatedPaymentApproval, InactiveReason,
};
pub use arns::{ArNsIntent, ArNsPurchase, ArNsPurchaseStatus};
pub use audit::{AuditChangeReason, AuditEntry};
pub use crypto::{
    CreditedPaymentTransaction, FailedPaymentTransaction,
    PendingPaymentTransaction,
};
pub use gift::{RedeemedGift, UnredeemedGift};
pub use quote::{
    ChargebackReceipt, CurrencyType, FailedTopUpQuote, PaymentProvider,
    PaymentReceipt, TopUpQuote,
};
pub use reservation::{BalanceReservation, OverflowSpend};
pub use user::User;
