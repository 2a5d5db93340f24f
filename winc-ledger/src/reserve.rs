//! Payer selection and spend planning.
//!
//! A reservation (or an ArNS purchase order) names a signer, a final price,
//! and an optional ordered `paid_by` list. The engine walks the candidate
//! payers in order and plans a set of debits covering the price:
//!
//! - a payer other than the signer contributes through its active approvals
//!   for the signer (soonest-expiring first);
//! - the signer contributes from its own spendable balance.
//!
//! Planning is a read-only pass; the plan is applied only once it fully
//! covers the price, so a shortfall never leaves a partial debit behind.

use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};
use winc_common::{
    address::{UserAddress, UserAddressType},
    ids::{DataItemId, ReservationId},
    time::TimestampMs,
    winc::{SignedWinc, Winc},
};

use crate::{
    entities::{
        AppliedAdjustment, AuditChangeReason, InactiveDelegatedPaymentApproval,
        InactiveReason, OverflowSpend,
    },
    error::{BalanceShortfall, LedgerError},
    store::Tables,
};

/// How the `paid_by` list combines with the signer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub enum PaymentDirective {
    /// Only the listed payers may be charged. An empty list is a
    /// `BadRequest`.
    ListOnly,
    /// The listed payers are charged first, in order; the signer's own
    /// balance is the fallback.
    #[default]
    ListOrSigner,
}

impl FromStr for PaymentDirective {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list-only" => Ok(Self::ListOnly),
            "list-or-signer" => Ok(Self::ListOrSigner),
            _ => Err(anyhow::anyhow!("unknown payment directive: {s}")),
        }
    }
}

impl std::fmt::Display for PaymentDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListOnly => f.write_str("list-only"),
            Self::ListOrSigner => f.write_str("list-or-signer"),
        }
    }
}

/// Input to [`crate::LedgerDb::create_balance_reservation`].
#[derive(Clone, Debug)]
pub struct ReserveParams {
    pub reservation_id: ReservationId,
    pub data_item_id: DataItemId,
    pub signer_address: UserAddress,
    pub signer_address_type: UserAddressType,
    /// The final price, after upload adjustments.
    pub reserved_winc: Winc,
    /// The network (un-adjusted) price.
    pub network_winc: Winc,
    pub adjustments: Vec<AppliedAdjustment>,
    pub paid_by: Vec<UserAddress>,
    pub directive: PaymentDirective,
}

/// Where a planned debit comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum DebitSource {
    OwnBalance,
    Approval(DataItemId),
}

#[derive(Clone, Debug)]
pub(crate) struct PlannedDebit {
    pub(crate) paying_address: UserAddress,
    pub(crate) amount: Winc,
    pub(crate) source: DebitSource,
}

/// A set of debits that exactly covers the price.
#[derive(Clone, Debug)]
pub(crate) struct SpendPlan {
    pub(crate) debits: Vec<PlannedDebit>,
}

impl SpendPlan {
    /// Collapses the plan into per-payer shares, in payer order.
    pub(crate) fn overflow_spend(&self) -> Vec<OverflowSpend> {
        let mut spends: Vec<OverflowSpend> = Vec::new();
        for debit in &self.debits {
            match spends
                .iter_mut()
                .find(|spend| spend.paying_address == debit.paying_address)
            {
                Some(spend) => spend.winc_amount += &debit.amount,
                None => spends.push(OverflowSpend {
                    paying_address: debit.paying_address.clone(),
                    winc_amount: debit.amount.clone(),
                }),
            }
        }
        spends
    }
}

/// Builds the ordered payer candidate list for a directive.
pub(crate) fn candidate_payers(
    signer: &UserAddress,
    paid_by: &[UserAddress],
    directive: PaymentDirective,
) -> Result<Vec<UserAddress>, LedgerError> {
    // Deduplicate while preserving order; planning reads approval balances
    // from a snapshot, so a payer listed twice must only be planned once.
    let dedup = |list: &[UserAddress]| {
        let mut payers: Vec<UserAddress> = Vec::with_capacity(list.len());
        for payer in list {
            if !payers.contains(payer) {
                payers.push(payer.clone());
            }
        }
        payers
    };

    match directive {
        PaymentDirective::ListOnly => {
            if paid_by.is_empty() {
                return Err(LedgerError::BadRequest(
                    "paid-by list must not be empty with the list-only \
                     directive"
                        .to_owned(),
                ));
            }
            Ok(dedup(paid_by))
        }
        PaymentDirective::ListOrSigner => {
            let mut payers = dedup(paid_by);
            if !payers.contains(signer) {
                payers.push(signer.clone());
            }
            Ok(payers)
        }
    }
}

impl Tables {
    /// Plans debits covering `price` from the candidate payers, in order.
    /// Fails with [`LedgerError::InsufficientBalance`] (and a breakdown of
    /// what was actually spendable) if the candidates cannot cover it.
    pub(crate) fn plan_spend(
        &self,
        signer: &UserAddress,
        payers: &[UserAddress],
        price: &Winc,
        now: TimestampMs,
    ) -> Result<SpendPlan, LedgerError> {
        let mut owed = price.clone();
        let mut debits = Vec::new();
        let mut available_own = Winc::zero();
        let mut available_received = Winc::zero();

        for payer in payers {
            if payer == signer {
                let spendable = self.spendable_balance(signer);
                available_own += &spendable;
                let take = spendable.min(owed.clone());
                if !take.is_zero() {
                    owed = owed
                        .checked_sub(&take)
                        .expect("take is bounded by owed");
                    debits.push(PlannedDebit {
                        paying_address: payer.clone(),
                        amount: take,
                        source: DebitSource::OwnBalance,
                    });
                }
            } else {
                for approval in self.approvals_for_pair(payer, signer, now) {
                    let remaining = approval.remaining();
                    available_received += &remaining;
                    let take = remaining.min(owed.clone());
                    if take.is_zero() {
                        continue;
                    }
                    owed = owed
                        .checked_sub(&take)
                        .expect("take is bounded by owed");
                    debits.push(PlannedDebit {
                        paying_address: payer.clone(),
                        amount: take,
                        source: DebitSource::Approval(
                            approval.approval_data_item_id.clone(),
                        ),
                    });
                }
            }
            if owed.is_zero() {
                break;
            }
        }

        if !owed.is_zero() {
            return Err(LedgerError::InsufficientBalance(BalanceShortfall {
                needed: price.clone(),
                available_own,
                available_received,
            }));
        }

        Ok(SpendPlan { debits })
    }

    /// Applies a plan produced by [`plan_spend`](Self::plan_spend) under the
    /// same lock. Debits the signer's balance and increments approval usage,
    /// archiving approvals that become fully consumed, and records one audit
    /// row per debit (`own_reason` for the signer's share,
    /// `approval_reason`, zero-delta, for each approval share).
    pub(crate) fn apply_spend_plan(
        &mut self,
        signer: &UserAddress,
        plan: &SpendPlan,
        own_reason: AuditChangeReason,
        approval_reason: AuditChangeReason,
        change_id: &str,
        now: TimestampMs,
    ) {
        let mut own_share = Winc::zero();

        for debit in &plan.debits {
            match &debit.source {
                DebitSource::OwnBalance => {
                    self.debit_balance_checked(signer, &debit.amount)
                        .expect("plan was computed under this lock");
                    own_share += &debit.amount;
                }
                DebitSource::Approval(approval_id) => {
                    let approval = self
                        .active_approvals
                        .get_mut(approval_id)
                        .expect("plan was computed under this lock");
                    approval.used_winc_amount += &debit.amount;
                    debug_assert!(
                        approval.used_winc_amount
                            <= approval.approved_winc_amount
                    );
                    let consumed =
                        approval.used_winc_amount == approval.approved_winc_amount;
                    if consumed {
                        let approval = self
                            .active_approvals
                            .remove(approval_id)
                            .expect("present just above");
                        self.inactive_approvals.insert(
                            approval_id.clone(),
                            InactiveDelegatedPaymentApproval {
                                approval,
                                inactive_reason: InactiveReason::Used,
                                inactive_date: now,
                                revoke_data_item_id: None,
                            },
                        );
                    }
                    self.audit(
                        &debit.paying_address,
                        SignedWinc::zero(),
                        approval_reason,
                        Some(change_id.to_owned()),
                        now,
                    );
                }
            }
        }

        // The signer's share is audited even when zero so every spend leaves
        // a row attributed to the signer.
        self.audit(
            signer,
            SignedWinc::debit(&own_share),
            own_reason,
            Some(change_id.to_owned()),
            now,
        );
    }

    /// Active, unexpired approvals from `paying` to `approved`, ordered
    /// soonest-expiring first (never-expiring last), then oldest first.
    fn approvals_for_pair(
        &self,
        paying: &UserAddress,
        approved: &UserAddress,
        now: TimestampMs,
    ) -> Vec<&crate::entities::DelegatedPaymentApproval> {
        let mut approvals = self
            .active_approvals
            .values()
            .filter(|approval| {
                &approval.paying_address == paying
                    && &approval.approved_address == approved
                    && !approval.is_expired(now)
            })
            .collect::<Vec<_>>();
        approvals.sort_by_key(|approval| {
            (
                approval.expiration_date.is_none(),
                approval.expiration_date,
                approval.creation_date,
            )
        });
        approvals
    }
}
