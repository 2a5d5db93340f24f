//! Pending crypto payment transactions: create, credit, fail.

use tracing::info;
use winc_common::{
    address::{DestinationType, TokenType},
    ids::TxId,
    time::TimestampMs,
    winc::SignedWinc,
};

use crate::{
    entities::{
        AuditChangeReason, CreditedPaymentTransaction,
        FailedPaymentTransaction, PendingPaymentTransaction,
    },
    error::LedgerError,
    store::LedgerDb,
};

impl LedgerDb {
    /// Records an observed on-chain payment. Idempotent on
    /// `(tx_id, token_type)`: a second call returns the existing pending row
    /// rather than duplicating it.
    pub async fn create_pending_transaction(
        &self,
        transaction: PendingPaymentTransaction,
    ) -> Result<PendingPaymentTransaction, LedgerError> {
        let mut tables = self.lock().await;
        let key = (transaction.tx_id.clone(), transaction.token_type);

        if let Some(existing) = tables.pending_txs.get(&key) {
            return Ok(existing.clone());
        }
        if tables.credited_txs.contains_key(&key) {
            return Err(LedgerError::TransactionAlreadyCredited {
                tx_id: key.0,
                token_type: key.1,
            });
        }
        if tables.failed_txs.contains_key(&key) {
            return Err(LedgerError::BadRequest(format!(
                "transaction {} ({}) previously failed",
                key.0, key.1,
            )));
        }

        tables.pending_txs.insert(key, transaction.clone());
        Ok(transaction)
    }

    /// Promotes a confirmed pending transaction: deletes the pending row,
    /// inserts the credited row, and credits the destination, all in one
    /// commit.
    pub async fn credit_pending_transaction(
        &self,
        tx_id: &TxId,
        token_type: TokenType,
        block_height: u64,
        now: TimestampMs,
    ) -> Result<CreditedPaymentTransaction, LedgerError> {
        let mut tables = self.lock().await;
        let key = (tx_id.clone(), token_type);

        if tables.credited_txs.contains_key(&key) {
            return Err(LedgerError::TransactionAlreadyCredited {
                tx_id: key.0,
                token_type: key.1,
            });
        }
        let Some(transaction) = tables.pending_txs.remove(&key) else {
            return Err(LedgerError::TransactionNotPending {
                tx_id: key.0,
                token_type: key.1,
            });
        };

        let address_type = match transaction.destination_address_type {
            DestinationType::User(address_type) => address_type,
            // Crypto payments always target a concrete chain address.
            DestinationType::Email => {
                tables.pending_txs.insert(key.clone(), transaction);
                return Err(LedgerError::BadRequest(
                    "crypto payments cannot target an email destination"
                        .to_owned(),
                ));
            }
        };

        tables.ensure_user(
            &transaction.destination_address,
            address_type,
            now,
            AuditChangeReason::AccountCreation,
        );
        tables.credit_balance(
            &transaction.destination_address,
            &transaction.winc_amount,
        );
        tables.audit(
            &transaction.destination_address,
            SignedWinc::credit(&transaction.winc_amount),
            AuditChangeReason::CryptoPayment,
            Some(tx_id.to_string()),
            now,
        );

        let credited = CreditedPaymentTransaction {
            transaction,
            credited_date: now,
            block_height,
        };
        tables.credited_txs.insert(key, credited.clone());
        info!(%tx_id, %token_type, block_height, "credited payment transaction");
        Ok(credited)
    }

    /// Moves a pending transaction into the failed set. No balance change.
    pub async fn fail_pending_transaction(
        &self,
        tx_id: &TxId,
        token_type: TokenType,
        reason: &str,
        now: TimestampMs,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock().await;
        let key = (tx_id.clone(), token_type);

        if tables.credited_txs.contains_key(&key) {
            return Err(LedgerError::TransactionAlreadyCredited {
                tx_id: key.0,
                token_type: key.1,
            });
        }
        let Some(transaction) = tables.pending_txs.remove(&key) else {
            return Err(LedgerError::TransactionNotPending {
                tx_id: key.0,
                token_type: key.1,
            });
        };

        tables.failed_txs.insert(
            key,
            FailedPaymentTransaction {
                transaction,
                failed_reason: reason.to_owned(),
                failed_date: now,
            },
        );
        Ok(())
    }

    pub async fn get_pending_transaction(
        &self,
        tx_id: &TxId,
        token_type: TokenType,
    ) -> Option<PendingPaymentTransaction> {
        let tables = self.lock().await;
        tables
            .pending_txs
            .get(&(tx_id.clone(), token_type))
            .cloned()
    }

    /// Pending transactions created at or before `cutoff`, oldest first.
    /// The credit pipeline polls these.
    pub async fn get_pending_transactions_older_than(
        &self,
        cutoff: TimestampMs,
    ) -> Vec<PendingPaymentTransaction> {
        let tables = self.lock().await;
        let mut pending = tables
            .pending_txs
            .values()
            .filter(|tx| tx.created_date <= cutoff)
            .cloned()
            .collect::<Vec<_>>();
        pending.sort_by_key(|tx| tx.created_date);
        pending
    }

    pub async fn get_credited_transaction(
        &self,
        tx_id: &TxId,
        token_type: TokenType,
    ) -> Option<CreditedPaymentTransaction> {
        let tables = self.lock().await;
        tables
            .credited_txs
            .get(&(tx_id.clone(), token_type))
            .cloned()
    }

    pub async fn get_failed_transaction(
        &self,
        tx_id: &TxId,
        token_type: TokenType,
    ) -> Option<FailedPaymentTransaction> {
        let tables = self.lock().await;
        tables
            .failed_txs
            .get(&(tx_id.clone(), token_type))
            .cloned()
    }
}
