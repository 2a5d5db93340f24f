//! Delegated payment approvals: create, revoke, expire.

use std::time::Duration;

use tracing::info;
use winc_common::{
    address::UserAddress,
    ids::DataItemId,
    time::TimestampMs,
    winc::{SignedWinc, Winc},
};

use crate::{
    entities::{
        AuditChangeReason, DelegatedPaymentApproval,
        InactiveDelegatedPaymentApproval, InactiveReason,
    },
    error::LedgerError,
    store::{LedgerDb, Tables},
};

impl LedgerDb {
    /// Earmarks `amount` of the payer's balance for the approved address.
    /// The amount is debited from the payer's spendable balance immediately;
    /// revocation or expiry returns whatever remains unused.
    pub async fn create_delegated_payment_approval(
        &self,
        approval_data_item_id: DataItemId,
        paying_address: &UserAddress,
        approved_address: &UserAddress,
        amount: &Winc,
        expires_in: Option<Duration>,
        now: TimestampMs,
    ) -> Result<DelegatedPaymentApproval, LedgerError> {
        let mut tables = self.lock().await;

        if tables.approval_id_taken(&approval_data_item_id) {
            return Err(LedgerError::ApprovalAlreadyExists(
                approval_data_item_id,
            ));
        }
        if amount.is_zero() {
            return Err(LedgerError::BadRequest(
                "approval amount must be non-zero".to_owned(),
            ));
        }
        if !tables.users.contains_key(paying_address) {
            return Err(LedgerError::UserNotFound(paying_address.clone()));
        }

        tables.debit_balance_checked(paying_address, amount)?;

        let approval = DelegatedPaymentApproval {
            approval_data_item_id: approval_data_item_id.clone(),
            paying_address: paying_address.clone(),
            approved_address: approved_address.clone(),
            approved_winc_amount: amount.clone(),
            used_winc_amount: Winc::zero(),
            creation_date: now,
            expiration_date: expires_in.map(|ttl| now + ttl),
        };
        tables
            .active_approvals
            .insert(approval_data_item_id.clone(), approval.clone());
        tables.audit(
            paying_address,
            SignedWinc::debit(amount),
            AuditChangeReason::DelegatedPaymentApproval,
            Some(approval_data_item_id.to_string()),
            now,
        );
        info!(
            approval = %approval_data_item_id,
            paying = %paying_address,
            approved = %approved_address,
            amount = %amount,
            "created delegated payment approval",
        );
        Ok(approval)
    }

    /// Revokes an active approval, returning `approved - used` to the payer.
    pub async fn revoke_delegated_payment_approval(
        &self,
        approval_data_item_id: &DataItemId,
        revoke_data_item_id: DataItemId,
        now: TimestampMs,
    ) -> Result<Winc, LedgerError> {
        let mut tables = self.lock().await;
        tables.archive_approval(
            approval_data_item_id,
            InactiveReason::Revoked,
            Some(revoke_data_item_id),
            AuditChangeReason::DelegatedPaymentRevoke,
            now,
        )
    }

    /// Archives every active approval whose expiration has passed, refunding
    /// the unused remainder of each to its payer. Returns the expired ids.
    pub async fn expire_delegated_payment_approvals(
        &self,
        now: TimestampMs,
    ) -> Vec<DataItemId> {
        let mut tables = self.lock().await;
        let expired = tables
            .active_approvals
            .values()
            .filter(|approval| approval.is_expired(now))
            .map(|approval| approval.approval_data_item_id.clone())
            .collect::<Vec<_>>();
        for approval_id in &expired {
            tables
                .archive_approval(
                    approval_id,
                    InactiveReason::Expired,
                    None,
                    AuditChangeReason::DelegatedPaymentExpired,
                    now,
                )
                .expect("collected from the active set above");
        }
        expired
    }

    pub async fn get_delegated_payment_approval(
        &self,
        approval_data_item_id: &DataItemId,
    ) -> Result<DelegatedPaymentApproval, LedgerError> {
        let tables = self.lock().await;
        tables
            .active_approvals
            .get(approval_data_item_id)
            .cloned()
            .ok_or_else(|| {
                LedgerError::ApprovalNotFound(approval_data_item_id.clone())
            })
    }

    pub async fn get_inactive_approval(
        &self,
        approval_data_item_id: &DataItemId,
    ) -> Option<InactiveDelegatedPaymentApproval> {
        let tables = self.lock().await;
        tables.inactive_approvals.get(approval_data_item_id).cloned()
    }

    /// Active approvals between a specific payer and approved address.
    pub async fn get_approvals_for_pair(
        &self,
        paying_address: &UserAddress,
        approved_address: &UserAddress,
    ) -> Vec<DelegatedPaymentApproval> {
        let tables = self.lock().await;
        tables
            .active_approvals
            .values()
            .filter(|approval| {
                &approval.paying_address == paying_address
                    && &approval.approved_address == approved_address
            })
            .cloned()
            .collect()
    }
}

impl Tables {
    /// An approval id is taken while the approval is active and stays taken
    /// after it archives.
    fn approval_id_taken(&self, approval_data_item_id: &DataItemId) -> bool {
        self.active_approvals.contains_key(approval_data_item_id)
            || self.inactive_approvals.contains_key(approval_data_item_id)
    }

    /// Moves an active approval into the inactive set, crediting the unused
    /// remainder back to the payer and auditing it with `audit_reason`.
    pub(crate) fn archive_approval(
        &mut self,
        approval_data_item_id: &DataItemId,
        inactive_reason: InactiveReason,
        revoke_data_item_id: Option<DataItemId>,
        audit_reason: AuditChangeReason,
        now: TimestampMs,
    ) -> Result<Winc, LedgerError> {
        let approval = self
            .active_approvals
            .remove(approval_data_item_id)
            .ok_or_else(|| {
                LedgerError::ApprovalNotFound(approval_data_item_id.clone())
            })?;

        let remainder = approval.remaining();
        let paying_address = approval.paying_address.clone();
        if !remainder.is_zero() {
            self.credit_balance(&paying_address, &remainder);
        }
        let change_id = revoke_data_item_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| approval_data_item_id.to_string());
        self.audit(
            &paying_address,
            SignedWinc::credit(&remainder),
            audit_reason,
            Some(change_id),
            now,
        );

        self.inactive_approvals.insert(
            approval_data_item_id.clone(),
            InactiveDelegatedPaymentApproval {
                approval,
                inactive_reason,
                inactive_date: now,
                revoke_data_item_id,
            },
        );
        Ok(remainder)
    }
}
