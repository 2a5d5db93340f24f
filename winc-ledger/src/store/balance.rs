//! The balance view returned to callers.

use serde::{Deserialize, Serialize};
use winc_common::{
    address::UserAddress,
    winc::{SignedWinc, Winc},
};

use crate::{
    entities::DelegatedPaymentApproval,
    error::LedgerError,
    store::LedgerDb,
};

/// A user's balance, broken down across delegated approvals.
///
/// - `winc` is what the user's own uploads can spend: the stored balance
///   (earmarks for given approvals were already removed when the approvals
///   were created).
/// - `controlled_winc` adds back the unused remainder of given approvals:
///   everything the user still controls, since those remainders return on
///   revocation or expiry.
/// - `effective_balance` adds the unused remainder of received approvals:
///   everything the user's uploads could draw on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub winc: SignedWinc,
    pub controlled_winc: SignedWinc,
    pub effective_balance: SignedWinc,
    pub given_approvals: Vec<DelegatedPaymentApproval>,
    pub received_approvals: Vec<DelegatedPaymentApproval>,
}

impl LedgerDb {
    pub async fn get_balance(
        &self,
        address: &UserAddress,
    ) -> Result<Balance, LedgerError> {
        let tables = self.lock().await;
        let user = tables
            .users
            .get(address)
            .ok_or_else(|| LedgerError::UserNotFound(address.clone()))?;

        let mut given_approvals = Vec::new();
        let mut received_approvals = Vec::new();
        for approval in tables.active_approvals.values() {
            if &approval.paying_address == address {
                given_approvals.push(approval.clone());
            }
            if &approval.approved_address == address {
                received_approvals.push(approval.clone());
            }
        }
        given_approvals
            .sort_by_key(|approval| approval.creation_date);
        received_approvals
            .sort_by_key(|approval| approval.creation_date);

        let given_remaining = remaining_sum(&given_approvals);
        let received_remaining = remaining_sum(&received_approvals);

        let winc = user.winc_balance.clone();
        let controlled_winc =
            winc.clone() + SignedWinc::credit(&given_remaining);
        let effective_balance =
            winc.clone() + SignedWinc::credit(&received_remaining);

        Ok(Balance {
            winc,
            controlled_winc,
            effective_balance,
            given_approvals,
            received_approvals,
        })
    }
}

fn remaining_sum(approvals: &[DelegatedPaymentApproval]) -> Winc {
    approvals.iter().map(DelegatedPaymentApproval::remaining).sum()
}
