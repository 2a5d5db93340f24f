//! ArNS purchase orders: quote, submit, complete, fail.

use tracing::info;
use winc_common::{
    address::UserAddressType,
    ids::{MessageId, PurchaseId},
    time::TimestampMs,
    winc::SignedWinc,
};

use crate::{
    entities::{ArNsPurchase, ArNsPurchaseStatus, AuditChangeReason},
    error::LedgerError,
    reserve::{candidate_payers, PaymentDirective},
    store::LedgerDb,
};

impl LedgerDb {
    /// Records a priced name order. No winc moves until submission.
    pub async fn create_arns_purchase_quote(
        &self,
        purchase: ArNsPurchase,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock().await;
        if tables.arns_purchases.contains_key(&purchase.purchase_id) {
            return Err(LedgerError::BadRequest(format!(
                "arns purchase {} already exists",
                purchase.purchase_id,
            )));
        }
        debug_assert!(matches!(purchase.status, ArNsPurchaseStatus::Quote));
        tables
            .arns_purchases
            .insert(purchase.purchase_id.clone(), purchase);
        Ok(())
    }

    /// Pays for a quoted purchase and records the outbound message id.
    /// The owner's balance and approvals are debited through the same payer
    /// selection as upload reservations.
    pub async fn submit_arns_purchase(
        &self,
        purchase_id: &PurchaseId,
        owner_address_type: UserAddressType,
        message_id: MessageId,
        directive: PaymentDirective,
        now: TimestampMs,
    ) -> Result<ArNsPurchase, LedgerError> {
        let mut tables = self.lock().await;

        let purchase = tables
            .arns_purchases
            .get(purchase_id)
            .ok_or_else(|| LedgerError::PurchaseNotFound(purchase_id.clone()))?;
        if !matches!(purchase.status, ArNsPurchaseStatus::Quote) {
            return Err(LedgerError::PurchaseInWrongState {
                purchase_id: purchase_id.clone(),
                expected: "quote",
                actual: status_name(&purchase.status),
            });
        }

        let owner = purchase.owner_address.clone();
        let price = purchase.winc_amount.clone();
        let payers = candidate_payers(&owner, &purchase.paid_by, directive)?;

        let plan = tables.plan_spend(&owner, &payers, &price, now)?;
        // A brand-new owner paying purely through approvals still gets a
        // user row, so later refunds have somewhere to land.
        tables.ensure_user(
            &owner,
            owner_address_type,
            now,
            AuditChangeReason::ArnsAccountCreation,
        );
        tables.apply_spend_plan(
            &owner,
            &plan,
            AuditChangeReason::ArnsPurchaseOrder,
            AuditChangeReason::ApprovedArnsPurchaseOrder,
            purchase_id.as_str(),
            now,
        );

        let purchase = tables
            .arns_purchases
            .get_mut(purchase_id)
            .expect("present just above");
        purchase.status = ArNsPurchaseStatus::Pending {
            message_id: message_id.clone(),
        };
        let purchase = purchase.clone();
        info!(
            purchase = %purchase_id,
            owner = %owner,
            message = %message_id,
            "submitted arns purchase",
        );
        Ok(purchase)
    }

    /// The external name action settled; nothing further moves.
    pub async fn complete_arns_purchase(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock().await;
        let purchase = tables
            .arns_purchases
            .get_mut(purchase_id)
            .ok_or_else(|| LedgerError::PurchaseNotFound(purchase_id.clone()))?;
        match &purchase.status {
            ArNsPurchaseStatus::Pending { message_id } => {
                purchase.status = ArNsPurchaseStatus::Success {
                    message_id: message_id.clone(),
                };
                Ok(())
            }
            other => Err(LedgerError::PurchaseInWrongState {
                purchase_id: purchase_id.clone(),
                expected: "pending",
                actual: status_name(other),
            }),
        }
    }

    /// The order failed; the debited winc returns to the owner atomically.
    pub async fn fail_arns_purchase(
        &self,
        purchase_id: &PurchaseId,
        reason: &str,
        now: TimestampMs,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock().await;
        let purchase = tables
            .arns_purchases
            .get(purchase_id)
            .ok_or_else(|| LedgerError::PurchaseNotFound(purchase_id.clone()))?;
        if !matches!(purchase.status, ArNsPurchaseStatus::Pending { .. }) {
            return Err(LedgerError::PurchaseInWrongState {
                purchase_id: purchase_id.clone(),
                expected: "pending",
                actual: status_name(&purchase.status),
            });
        }

        let owner = purchase.owner_address.clone();
        let amount = purchase.winc_amount.clone();
        tables.credit_balance(&owner, &amount);
        tables.audit(
            &owner,
            SignedWinc::credit(&amount),
            AuditChangeReason::ArnsPurchaseOrderFailed,
            Some(purchase_id.to_string()),
            now,
        );

        let purchase = tables
            .arns_purchases
            .get_mut(purchase_id)
            .expect("present just above");
        purchase.status = ArNsPurchaseStatus::Failed {
            failed_reason: reason.to_owned(),
            failed_date: now,
        };
        Ok(())
    }

    pub async fn get_arns_purchase(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<ArNsPurchase, LedgerError> {
        let tables = self.lock().await;
        tables
            .arns_purchases
            .get(purchase_id)
            .cloned()
            .ok_or_else(|| LedgerError::PurchaseNotFound(purchase_id.clone()))
    }
}

fn status_name(status: &ArNsPurchaseStatus) -> &'static str {
    match status {
        ArNsPurchaseStatus::Quote => "quote",
        ArNsPurchaseStatus::Pending { .. } => "pending",
        ArNsPurchaseStatus::Success { .. } => "success",
        ArNsPurchaseStatus::Failed { .. } => "failed",
    }
}
