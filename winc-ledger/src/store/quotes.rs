//! Top-up quote lifecycle: create, fulfill, fail, chargeback, refund.

use std::time::Duration;

use tracing::info;
use winc_common::{
    address::DestinationType,
    constants::GIFT_TTL_SECS,
    ids::{ChargebackId, QuoteId, ReceiptId},
    time::TimestampMs,
    winc::SignedWinc,
};

use crate::{
    entities::{
        AppliedPaymentAdjustment, AuditChangeReason, ChargebackReceipt,
        FailedTopUpQuote, PaymentReceipt, TopUpQuote, UnredeemedGift,
    },
    error::LedgerError,
    store::{LedgerDb, Tables},
};

/// Reason recorded on quotes failed by the expiry sweeper.
pub const QUOTE_EXPIRED_REASON: &str = "expired";

impl LedgerDb {
    /// Inserts a new quote and its applied payment adjustments.
    pub async fn create_top_up_quote(
        &self,
        quote: TopUpQuote,
        adjustments: Vec<AppliedPaymentAdjustment>,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock().await;
        let quote_id = quote.quote_id.clone();
        if tables.quote_id_taken(&quote_id) {
            return Err(LedgerError::QuoteExists(quote_id));
        }
        for adjustment in adjustments {
            tables
                .payment_adjustments
                .push((quote_id.clone(), adjustment));
        }
        tables.top_up_quotes.insert(quote_id, quote);
        Ok(())
    }

    pub async fn get_top_up_quote(
        &self,
        quote_id: &QuoteId,
    ) -> Result<TopUpQuote, LedgerError> {
        let tables = self.lock().await;
        tables
            .top_up_quotes
            .get(quote_id)
            .cloned()
            .ok_or_else(|| LedgerError::QuoteNotFound(quote_id.clone()))
    }

    /// Payment catalogs already consumed by quotes addressed to `address`,
    /// across live, fulfilled, and failed quotes. Single-use promo codes
    /// check against this.
    pub async fn payment_catalogs_used_by(
        &self,
        address: &winc_common::address::UserAddress,
    ) -> std::collections::HashSet<crate::entities::CatalogId> {
        let tables = self.lock().await;
        tables
            .payment_adjustments
            .iter()
            .filter(|(quote_id, _)| {
                let destination = tables
                    .top_up_quotes
                    .get(quote_id)
                    .map(|quote| &quote.destination_address)
                    .or_else(|| {
                        tables
                            .payment_receipts
                            .get(quote_id)
                            .map(|receipt| &receipt.quote.destination_address)
                    })
                    .or_else(|| {
                        tables
                            .failed_top_up_quotes
                            .get(quote_id)
                            .map(|failed| &failed.quote.destination_address)
                    });
                destination == Some(address)
            })
            .map(|(_, adjustment)| adjustment.catalog_id.clone())
            .collect()
    }

    /// Marks a quote paid: issues the receipt, credits the destination (or
    /// parks the credits in an unredeemed gift for email destinations), and
    /// deletes the quote row.
    ///
    /// The expiry check happens here, under the store lock, so a concurrent
    /// sweep and fulfillment cannot both win.
    pub async fn fulfill_quote(
        &self,
        quote_id: &QuoteId,
        receipt_id: ReceiptId,
        sender_email: Option<String>,
        now: TimestampMs,
    ) -> Result<PaymentReceipt, LedgerError> {
        let mut tables = self.lock().await;

        let quote = tables
            .top_up_quotes
            .get(quote_id)
            .ok_or_else(|| LedgerError::QuoteNotFound(quote_id.clone()))?;
        if quote.is_expired(now) {
            return Err(LedgerError::QuoteExpired(quote_id.clone()));
        }
        if tables.payment_receipts.contains_key(quote_id) {
            return Err(LedgerError::PaymentReceiptAlreadyExists(
                quote_id.clone(),
            ));
        }

        let quote = tables
            .top_up_quotes
            .remove(quote_id)
            .expect("present just above");
        let receipt = PaymentReceipt {
            quote: quote.clone(),
            receipt_id: receipt_id.clone(),
            receipt_date: now,
            sender_email: sender_email.clone(),
        };

        match quote.destination_address_type {
            DestinationType::User(address_type) => {
                tables.ensure_user(
                    &quote.destination_address,
                    address_type,
                    now,
                    AuditChangeReason::AccountCreation,
                );
                tables
                    .credit_balance(&quote.destination_address, &quote.winc_amount);
                tables.audit(
                    &quote.destination_address,
                    SignedWinc::credit(&quote.winc_amount),
                    AuditChangeReason::Payment,
                    Some(quote_id.to_string()),
                    now,
                );
            }
            DestinationType::Email => {
                tables.unredeemed_gifts.insert(
                    receipt_id.clone(),
                    UnredeemedGift {
                        payment_receipt_id: receipt_id.clone(),
                        recipient_email: quote.destination_address.to_string(),
                        gifted_winc_amount: quote.winc_amount.clone(),
                        gift_message: quote.gift_message.clone(),
                        sender_email,
                        creation_date: now,
                        expiration_date: now
                            + Duration::from_secs(GIFT_TTL_SECS),
                    },
                );
                tables.audit(
                    &quote.destination_address,
                    SignedWinc::credit(&quote.winc_amount),
                    AuditChangeReason::GiftedPayment,
                    Some(quote_id.to_string()),
                    now,
                );
            }
        }

        tables
            .payment_receipts
            .insert(quote_id.clone(), receipt.clone());
        info!(%quote_id, %receipt_id, "fulfilled top-up quote");
        Ok(receipt)
    }

    /// Moves a quote into the failed set. The sweeper uses reason
    /// [`QUOTE_EXPIRED_REASON`].
    pub async fn fail_quote(
        &self,
        quote_id: &QuoteId,
        reason: &str,
        now: TimestampMs,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock().await;
        let quote = tables
            .top_up_quotes
            .remove(quote_id)
            .ok_or_else(|| LedgerError::QuoteNotFound(quote_id.clone()))?;
        tables.failed_top_up_quotes.insert(
            quote_id.clone(),
            FailedTopUpQuote {
                quote,
                failed_reason: reason.to_owned(),
                quote_failed_date: now,
            },
        );
        Ok(())
    }

    /// Fails every quote whose expiration has passed. Returns the failed
    /// quote ids.
    pub async fn fail_expired_quotes(
        &self,
        now: TimestampMs,
    ) -> Vec<QuoteId> {
        let mut tables = self.lock().await;
        let expired = tables
            .top_up_quotes
            .values()
            .filter(|quote| quote.is_expired(now))
            .map(|quote| quote.quote_id.clone())
            .collect::<Vec<_>>();
        for quote_id in &expired {
            let quote = tables
                .top_up_quotes
                .remove(quote_id)
                .expect("collected above");
            tables.failed_top_up_quotes.insert(
                quote_id.clone(),
                FailedTopUpQuote {
                    quote,
                    failed_reason: QUOTE_EXPIRED_REASON.to_owned(),
                    quote_failed_date: now,
                },
            );
        }
        expired
    }

    /// Applies a provider chargeback to a settled receipt, debiting the
    /// destination by the receipted amount. May push the balance negative.
    pub async fn chargeback(
        &self,
        quote_id: &QuoteId,
        chargeback_id: ChargebackId,
        reason: &str,
        now: TimestampMs,
    ) -> Result<ChargebackReceipt, LedgerError> {
        self.reverse_receipt(
            quote_id,
            Some(chargeback_id),
            reason,
            AuditChangeReason::Chargeback,
            now,
        )
        .await
    }

    /// Applies a provider refund to a settled receipt. Same accounting as a
    /// chargeback, audited with the `refund` reason.
    pub async fn refund_receipt(
        &self,
        quote_id: &QuoteId,
        reason: &str,
        now: TimestampMs,
    ) -> Result<ChargebackReceipt, LedgerError> {
        self.reverse_receipt(
            quote_id,
            None,
            reason,
            AuditChangeReason::Refund,
            now,
        )
        .await
    }

    async fn reverse_receipt(
        &self,
        quote_id: &QuoteId,
        chargeback_id: Option<ChargebackId>,
        reason: &str,
        audit_reason: AuditChangeReason,
        now: TimestampMs,
    ) -> Result<ChargebackReceipt, LedgerError> {
        let mut tables = self.lock().await;

        let receipt = tables
            .payment_receipts
            .remove(quote_id)
            .ok_or_else(|| LedgerError::PaymentReceiptNotFound(quote_id.clone()))?;
        let amount = receipt.quote.winc_amount.clone();
        let destination = receipt.quote.destination_address.clone();

        // The audit delta must land on whichever account actually held the
        // credits: the destination, the recipient email (credits still
        // parked in the gift), or the address the gift was redeemed to.
        match receipt.quote.destination_address_type {
            DestinationType::User(_) => {
                tables.reverse_credit(&destination, &amount);
                tables.audit(
                    &destination,
                    SignedWinc::debit(&amount),
                    audit_reason,
                    Some(quote_id.to_string()),
                    now,
                );
            }
            DestinationType::Email => {
                if tables.unredeemed_gifts.remove(&receipt.receipt_id).is_some()
                {
                    tables.audit(
                        &destination,
                        SignedWinc::debit(&amount),
                        audit_reason,
                        Some(quote_id.to_string()),
                        now,
                    );
                } else if let Some(redeemed) =
                    tables.redeemed_gifts.get(&receipt.receipt_id)
                {
                    let redeemer = redeemed.destination_address.clone();
                    tables.reverse_credit(&redeemer, &amount);
                    tables.audit(
                        &redeemer,
                        SignedWinc::debit(&amount),
                        audit_reason,
                        Some(quote_id.to_string()),
                        now,
                    );
                } else {
                    // Gift already swept and refunded; nothing left to
                    // reverse.
                    tables.audit(
                        &destination,
                        SignedWinc::zero(),
                        audit_reason,
                        Some(quote_id.to_string()),
                        now,
                    );
                }
            }
        }

        let chargeback_id = chargeback_id
            .unwrap_or_else(|| ChargebackId::new(receipt.receipt_id.to_string()));
        let chargeback = ChargebackReceipt {
            receipt,
            chargeback_id: chargeback_id.clone(),
            chargeback_reason: reason.to_owned(),
            chargeback_date: now,
        };
        tables
            .chargeback_receipts
            .insert(chargeback_id, chargeback.clone());
        Ok(chargeback)
    }
}

impl Tables {
    /// A quote id is taken while a quote is live and stays taken after it
    /// resolves into a receipt or failure.
    fn quote_id_taken(&self, quote_id: &QuoteId) -> bool {
        self.top_up_quotes.contains_key(quote_id)
            || self.payment_receipts.contains_key(quote_id)
            || self.failed_top_up_quotes.contains_key(quote_id)
            || self
                .chargeback_receipts
                .values()
                .any(|chargeback| &chargeback.receipt.quote.quote_id == quote_id)
    }

    /// Debits a settled credit back out, allowing a negative result. A
    /// missing user row means there is no balance to reverse.
    fn reverse_credit(
        &mut self,
        address: &winc_common::address::UserAddress,
        amount: &winc_common::winc::Winc,
    ) {
        if self.users.contains_key(address) {
            self.debit_balance_allow_negative(address, amount);
        }
    }
}
