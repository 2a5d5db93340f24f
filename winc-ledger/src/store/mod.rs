//! The transactional ledger store.
//!
//! All tables live behind one async mutex; holding the lock for the whole of
//! an operation makes every operation serializable by construction. Each
//! operation validates against current state before its first write, so an
//! error never leaves a partial commit behind.
//!
//! Audit rows are appended inside the same critical section as the balance
//! mutation they describe, which is what keeps the running per-user sum of
//! audit deltas equal to the user's balance.

mod approvals;
mod arns;
mod balance;
mod crypto;
mod gifts;
mod quotes;
mod reservations;

use std::{
    collections::HashMap,
    sync::Arc,
};

use tokio::sync::Mutex;
use tracing::debug;
use winc_common::{
    address::{TokenType, UserAddress, UserAddressType},
    ids::{AuditId, ChargebackId, DataItemId, PurchaseId, QuoteId, ReceiptId, TxId},
    time::TimestampMs,
    winc::{SignedWinc, Winc},
};

pub use balance::Balance;

use crate::{
    entities::{
        AppliedAdjustment, AppliedPaymentAdjustment, ArNsPurchase,
        AuditChangeReason, AuditEntry,
        BalanceReservation, ChargebackReceipt, CreditedPaymentTransaction,
        DelegatedPaymentApproval, FailedPaymentTransaction, FailedTopUpQuote,
        InactiveDelegatedPaymentApproval, PaymentReceipt,
        PendingPaymentTransaction, RedeemedGift, TopUpQuote, UnredeemedGift,
        User,
    },
    error::LedgerError,
};

/// Handle to the ledger store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct LedgerDb {
    inner: Arc<Mutex<Tables>>,
}

impl LedgerDb {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Tables::default())),
        }
    }

    pub(crate) async fn lock(
        &self,
    ) -> tokio::sync::MutexGuard<'_, Tables> {
        self.inner.lock().await
    }

    // --- Users --- //

    pub async fn get_user(
        &self,
        address: &UserAddress,
    ) -> Result<User, LedgerError> {
        let tables = self.lock().await;
        tables
            .users
            .get(address)
            .cloned()
            .ok_or_else(|| LedgerError::UserNotFound(address.clone()))
    }

    /// Admin path: credit winc without a quote or on-chain transaction.
    pub async fn add_credits_bypassed(
        &self,
        address: &UserAddress,
        address_type: UserAddressType,
        amount: &Winc,
        now: TimestampMs,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock().await;
        tables.ensure_user(
            address,
            address_type,
            now,
            AuditChangeReason::BypassedAccountCreation,
        );
        tables.credit_balance(address, amount);
        tables.audit(
            address,
            SignedWinc::credit(amount),
            AuditChangeReason::BypassedPayment,
            None,
            now,
        );
        Ok(())
    }

    // --- Audit --- //

    /// The running sum of audit deltas recorded for `address`. Equals the
    /// stored balance for every user; diagnostics and tests rely on this.
    pub async fn audited_balance(&self, address: &UserAddress) -> SignedWinc {
        let tables = self.lock().await;
        tables
            .audit_log
            .iter()
            .filter(|entry| &entry.user_address == address)
            .map(|entry| entry.signed_winc_delta.clone())
            .sum()
    }

    pub async fn audit_entries_for(
        &self,
        address: &UserAddress,
    ) -> Vec<AuditEntry> {
        let tables = self.lock().await;
        tables
            .audit_log
            .iter()
            .filter(|entry| &entry.user_address == address)
            .cloned()
            .collect()
    }
}

/// The persisted tables. One mutex over the whole set; see the module docs.
#[derive(Default)]
pub(crate) struct Tables {
    pub(crate) users: HashMap<UserAddress, User>,

    pub(crate) top_up_quotes: HashMap<QuoteId, TopUpQuote>,
    pub(crate) payment_receipts: HashMap<QuoteId, PaymentReceipt>,
    pub(crate) failed_top_up_quotes: HashMap<QuoteId, FailedTopUpQuote>,
    pub(crate) chargeback_receipts: HashMap<ChargebackId, ChargebackReceipt>,

    pub(crate) pending_txs: HashMap<(TxId, TokenType), PendingPaymentTransaction>,
    pub(crate) credited_txs: HashMap<(TxId, TokenType), CreditedPaymentTransaction>,
    pub(crate) failed_txs: HashMap<(TxId, TokenType), FailedPaymentTransaction>,

    pub(crate) reservations: HashMap<DataItemId, BalanceReservation>,
    pub(crate) refunded_reservations: HashMap<DataItemId, BalanceReservation>,

    pub(crate) active_approvals: HashMap<DataItemId, DelegatedPaymentApproval>,
    pub(crate) inactive_approvals:
        HashMap<DataItemId, InactiveDelegatedPaymentApproval>,

    pub(crate) payment_adjustments: Vec<(QuoteId, AppliedPaymentAdjustment)>,
    pub(crate) upload_adjustments: Vec<(DataItemId, AppliedAdjustment)>,

    pub(crate) unredeemed_gifts: HashMap<ReceiptId, UnredeemedGift>,
    pub(crate) redeemed_gifts: HashMap<ReceiptId, RedeemedGift>,

    pub(crate) arns_purchases: HashMap<PurchaseId, ArNsPurchase>,

    pub(crate) audit_log: Vec<AuditEntry>,
    next_audit_id: u64,
}

impl Tables {
    /// Appends a row to the audit log. Never exposed mutably elsewhere; rows
    /// are write-once.
    pub(crate) fn audit(
        &mut self,
        address: &UserAddress,
        delta: SignedWinc,
        reason: AuditChangeReason,
        change_id: Option<String>,
        now: TimestampMs,
    ) {
        self.next_audit_id += 1;
        let entry = AuditEntry {
            audit_id: AuditId(self.next_audit_id),
            user_address: address.clone(),
            signed_winc_delta: delta,
            change_reason: reason,
            change_id,
            audit_date: now,
        };
        debug!(
            address = %entry.user_address,
            delta = %entry.signed_winc_delta,
            reason = %entry.change_reason,
            "audit",
        );
        self.audit_log.push(entry);
    }

    /// Creates the user row at zero balance if absent, recording a zero-delta
    /// audit row with the flow-specific creation reason. Returns whether a
    /// row was created.
    pub(crate) fn ensure_user(
        &mut self,
        address: &UserAddress,
        address_type: UserAddressType,
        now: TimestampMs,
        creation_reason: AuditChangeReason,
    ) -> bool {
        if self.users.contains_key(address) {
            return false;
        }
        self.users.insert(
            address.clone(),
            User::new(address.clone(), address_type, now),
        );
        self.audit(address, SignedWinc::zero(), creation_reason, None, now);
        true
    }

    /// The winc spendable from the user's own balance: the stored balance
    /// clamped at zero (a chargeback may have pushed it negative).
    pub(crate) fn spendable_balance(&self, address: &UserAddress) -> Winc {
        self.users
            .get(address)
            .map(|user| user.winc_balance.clamped_to_winc())
            .unwrap_or_else(Winc::zero)
    }

    /// Adds to a user's balance. The user row must already exist; call
    /// [`ensure_user`](Self::ensure_user) first on credit paths.
    pub(crate) fn credit_balance(
        &mut self,
        address: &UserAddress,
        amount: &Winc,
    ) {
        let user = self
            .users
            .get_mut(address)
            .expect("credit_balance requires an existing user row");
        user.winc_balance += &SignedWinc::credit(amount);
    }

    /// Debits a user's balance, failing if the result would be negative.
    /// Reservations and approval creation go through this.
    pub(crate) fn debit_balance_checked(
        &mut self,
        address: &UserAddress,
        amount: &Winc,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let spendable = self.spendable_balance(address);
        if &spendable < amount {
            return Err(LedgerError::InsufficientBalance(
                crate::error::BalanceShortfall {
                    needed: amount.clone(),
                    available_own: spendable,
                    available_received: Winc::zero(),
                },
            ));
        }
        let user = self
            .users
            .get_mut(address)
            .expect("spendable was non-zero, so the row exists");
        user.winc_balance += &SignedWinc::debit(amount);
        Ok(())
    }

    /// Debits a user's balance, permitting a negative result. Only the
    /// chargeback and refund paths use this.
    pub(crate) fn debit_balance_allow_negative(
        &mut self,
        address: &UserAddress,
        amount: &Winc,
    ) {
        let user = self
            .users
            .get_mut(address)
            .expect("chargebacks require an existing user row");
        user.winc_balance += &SignedWinc::debit(amount);
        if user.winc_balance.is_negative() {
            tracing::warn!(
                address = %address,
                balance = %user.winc_balance,
                "balance went negative",
            );
        }
    }
}
