//! Email-addressed gifts: redeem, expire, admin-grant.

use std::time::Duration;

use tracing::info;
use winc_common::{
    address::{UserAddress, UserAddressType},
    constants::GIFT_TTL_SECS,
    ids::ReceiptId,
    time::TimestampMs,
    winc::{SignedWinc, Winc},
};

use crate::{
    entities::{AuditChangeReason, RedeemedGift, UnredeemedGift},
    error::LedgerError,
    store::LedgerDb,
};

impl LedgerDb {
    /// Claims a gift: credits `destination_address` (creating the user row
    /// if needed) and moves the gift into the redeemed set.
    pub async fn redeem_gift(
        &self,
        payment_receipt_id: &ReceiptId,
        recipient_email: &str,
        destination_address: &UserAddress,
        destination_address_type: UserAddressType,
        now: TimestampMs,
    ) -> Result<RedeemedGift, LedgerError> {
        let mut tables = self.lock().await;

        let Some(gift) = tables.unredeemed_gifts.get(payment_receipt_id)
        else {
            return if tables.redeemed_gifts.contains_key(payment_receipt_id) {
                Err(LedgerError::GiftAlreadyRedeemed(
                    payment_receipt_id.clone(),
                ))
            } else {
                Err(LedgerError::GiftNotFound(payment_receipt_id.clone()))
            };
        };
        // The redemption link carries the email; an id guessed without it
        // must not pay out.
        if gift.recipient_email != recipient_email {
            return Err(LedgerError::BadRequest(
                "gift recipient email does not match".to_owned(),
            ));
        }
        if gift.is_expired(now) {
            return Err(LedgerError::GiftExpired(payment_receipt_id.clone()));
        }

        let gift = tables
            .unredeemed_gifts
            .remove(payment_receipt_id)
            .expect("present just above");
        let amount = gift.gifted_winc_amount.clone();

        tables.ensure_user(
            destination_address,
            destination_address_type,
            now,
            AuditChangeReason::GiftedAccountCreation,
        );
        tables.credit_balance(destination_address, &amount);
        tables.audit(
            destination_address,
            SignedWinc::credit(&amount),
            AuditChangeReason::GiftedPaymentRedemption,
            Some(payment_receipt_id.to_string()),
            now,
        );

        let redeemed = RedeemedGift {
            gift,
            destination_address: destination_address.clone(),
            redemption_date: now,
        };
        tables
            .redeemed_gifts
            .insert(payment_receipt_id.clone(), redeemed.clone());
        info!(
            receipt = %payment_receipt_id,
            destination = %destination_address,
            "redeemed gift",
        );
        Ok(redeemed)
    }

    /// Removes expired unredeemed gifts, auditing each removal against the
    /// recipient email. Returns the removed gifts so the caller can kick off
    /// the external fiat refunds.
    pub async fn expire_unredeemed_gifts(
        &self,
        now: TimestampMs,
    ) -> Vec<UnredeemedGift> {
        let mut tables = self.lock().await;
        let expired_ids = tables
            .unredeemed_gifts
            .values()
            .filter(|gift| gift.is_expired(now))
            .map(|gift| gift.payment_receipt_id.clone())
            .collect::<Vec<_>>();

        let mut expired = Vec::with_capacity(expired_ids.len());
        for receipt_id in expired_ids {
            let gift = tables
                .unredeemed_gifts
                .remove(&receipt_id)
                .expect("collected above");
            tables.audit(
                &UserAddress::new(gift.recipient_email.clone()),
                SignedWinc::debit(&gift.gifted_winc_amount),
                AuditChangeReason::Refund,
                Some(receipt_id.to_string()),
                now,
            );
            expired.push(gift);
        }
        expired
    }

    /// Admin path: park gifted credits for an email without a fiat payment.
    pub async fn create_gift_bypassed(
        &self,
        payment_receipt_id: ReceiptId,
        recipient_email: &str,
        amount: &Winc,
        gift_message: Option<String>,
        now: TimestampMs,
    ) -> Result<UnredeemedGift, LedgerError> {
        let mut tables = self.lock().await;
        if tables.unredeemed_gifts.contains_key(&payment_receipt_id)
            || tables.redeemed_gifts.contains_key(&payment_receipt_id)
        {
            return Err(LedgerError::BadRequest(format!(
                "gift already exists for receipt {payment_receipt_id}",
            )));
        }

        let gift = UnredeemedGift {
            payment_receipt_id: payment_receipt_id.clone(),
            recipient_email: recipient_email.to_owned(),
            gifted_winc_amount: amount.clone(),
            gift_message,
            sender_email: None,
            creation_date: now,
            expiration_date: now + Duration::from_secs(GIFT_TTL_SECS),
        };
        tables
            .unredeemed_gifts
            .insert(payment_receipt_id.clone(), gift.clone());
        tables.audit(
            &UserAddress::new(recipient_email),
            SignedWinc::credit(amount),
            AuditChangeReason::BypassedGiftedPayment,
            Some(payment_receipt_id.to_string()),
            now,
        );
        Ok(gift)
    }

    pub async fn get_unredeemed_gift(
        &self,
        payment_receipt_id: &ReceiptId,
    ) -> Option<UnredeemedGift> {
        let tables = self.lock().await;
        tables.unredeemed_gifts.get(payment_receipt_id).cloned()
    }
}
