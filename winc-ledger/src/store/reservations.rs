//! Balance reservations: create, refund, finalize.

use tracing::info;
use winc_common::{
    ids::DataItemId,
    time::TimestampMs,
    winc::SignedWinc,
};

use crate::{
    entities::{AuditChangeReason, BalanceReservation},
    error::LedgerError,
    reserve::{candidate_payers, ReserveParams},
    store::LedgerDb,
};

impl LedgerDb {
    /// Reserves winc for an upload, debiting the candidate payers in order
    /// (see [`crate::reserve`]). Either the full price is covered and the
    /// reservation commits, or nothing changes.
    pub async fn create_balance_reservation(
        &self,
        params: ReserveParams,
        now: TimestampMs,
    ) -> Result<BalanceReservation, LedgerError> {
        let ReserveParams {
            reservation_id,
            data_item_id,
            signer_address,
            signer_address_type,
            reserved_winc,
            network_winc,
            adjustments,
            paid_by,
            directive,
        } = params;

        let payers = candidate_payers(&signer_address, &paid_by, directive)?;

        let mut tables = self.lock().await;
        if tables.reservations.contains_key(&data_item_id)
            || tables.refunded_reservations.contains_key(&data_item_id)
        {
            return Err(LedgerError::ReservationExists(data_item_id));
        }

        let plan =
            tables.plan_spend(&signer_address, &payers, &reserved_winc, now)?;
        tables.apply_spend_plan(
            &signer_address,
            &plan,
            AuditChangeReason::Upload,
            AuditChangeReason::ApprovedUpload,
            data_item_id.as_str(),
            now,
        );

        let reservation = BalanceReservation {
            reservation_id,
            data_item_id: data_item_id.clone(),
            user_address: signer_address,
            user_address_type: signer_address_type,
            reserved_date: now,
            reserved_winc_amount: reserved_winc,
            network_winc_amount: network_winc,
            overflow_spend: plan.overflow_spend(),
        };
        for adjustment in adjustments {
            tables
                .upload_adjustments
                .push((data_item_id.clone(), adjustment));
        }
        tables
            .reservations
            .insert(data_item_id.clone(), reservation.clone());
        info!(
            data_item = %data_item_id,
            signer = %reservation.user_address,
            reserved = %reservation.reserved_winc_amount,
            "created balance reservation",
        );
        Ok(reservation)
    }

    /// Returns the reserved winc to the signer (e.g. the upload was never
    /// finalized) and retires the reservation.
    pub async fn refund_balance_reservation(
        &self,
        data_item_id: &DataItemId,
        now: TimestampMs,
    ) -> Result<BalanceReservation, LedgerError> {
        let mut tables = self.lock().await;
        let reservation = tables
            .reservations
            .remove(data_item_id)
            .ok_or_else(|| {
                LedgerError::ReservationNotFound(data_item_id.clone())
            })?;

        let signer = reservation.user_address.clone();
        let amount = reservation.reserved_winc_amount.clone();
        tables.ensure_user(
            &signer,
            reservation.user_address_type,
            now,
            AuditChangeReason::AccountCreation,
        );
        tables.credit_balance(&signer, &amount);
        tables.audit(
            &signer,
            SignedWinc::credit(&amount),
            AuditChangeReason::RefundedUpload,
            Some(data_item_id.to_string()),
            now,
        );

        tables
            .refunded_reservations
            .insert(data_item_id.clone(), reservation.clone());
        Ok(reservation)
    }

    /// Accepts the spend. A no-op on the ledger; the reservation simply
    /// stays in the reserved set.
    pub async fn finalize_balance_reservation(
        &self,
        data_item_id: &DataItemId,
    ) -> Result<(), LedgerError> {
        let tables = self.lock().await;
        if tables.reservations.contains_key(data_item_id) {
            Ok(())
        } else {
            Err(LedgerError::ReservationNotFound(data_item_id.clone()))
        }
    }

    pub async fn get_balance_reservation(
        &self,
        data_item_id: &DataItemId,
    ) -> Result<BalanceReservation, LedgerError> {
        let tables = self.lock().await;
        tables
            .reservations
            .get(data_item_id)
            .cloned()
            .ok_or_else(|| {
                LedgerError::ReservationNotFound(data_item_id.clone())
            })
    }
}
