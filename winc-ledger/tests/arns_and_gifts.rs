//! ArNS purchase lifecycle and email gift redemption scenarios.

use std::time::Duration;

use rust_decimal_macros::dec;
use winc_common::{
    address::{DestinationType, UserAddress, UserAddressType},
    ids::{DataItemId, MessageId, PurchaseId, QuoteId, ReceiptId},
    time::TimestampMs,
    winc::{SignedWinc, Winc},
};
use winc_ledger::{
    entities::{
        ArNsIntent, ArNsPurchase, ArNsPurchaseStatus, CurrencyType,
        PaymentProvider, TopUpQuote,
    },
    reserve::PaymentDirective,
    LedgerDb, LedgerError,
};

fn now() -> TimestampMs {
    TimestampMs::from_millis(1_700_000_000_000).unwrap()
}

fn addr(s: &str) -> UserAddress {
    UserAddress::new(s)
}

async fn fund(db: &LedgerDb, address: &str, winc: u64) {
    db.add_credits_bypassed(
        &addr(address),
        UserAddressType::Ario,
        &Winc::from(winc),
        now(),
    )
    .await
    .unwrap();
}

fn purchase_quote(id: &str, owner: &str, winc: u64) -> ArNsPurchase {
    ArNsPurchase {
        purchase_id: PurchaseId::new(id),
        owner_address: addr(owner),
        name: "my-name".to_owned(),
        intent: ArNsIntent::LeaseName,
        winc_amount: Winc::from(winc),
        dust_mario_amount: 1,
        created_date: now(),
        status: ArNsPurchaseStatus::Quote,
        paid_by: vec![],
    }
}

#[tokio::test]
async fn arns_purchase_debits_then_refunds_on_failure() {
    let db = LedgerDb::new();
    fund(&db, "OWNER", 1000).await;

    db.create_arns_purchase_quote(purchase_quote("P1", "OWNER", 600))
        .await
        .unwrap();
    db.submit_arns_purchase(
        &PurchaseId::new("P1"),
        UserAddressType::Ario,
        MessageId::new("M1"),
        PaymentDirective::ListOrSigner,
        now(),
    )
    .await
    .unwrap();

    let owner = db.get_user(&addr("OWNER")).await.unwrap();
    assert_eq!(owner.winc_balance, SignedWinc::credit(&Winc::from(400u64)));

    db.fail_arns_purchase(&PurchaseId::new("P1"), "name taken", now())
        .await
        .unwrap();

    let owner = db.get_user(&addr("OWNER")).await.unwrap();
    assert_eq!(owner.winc_balance, SignedWinc::credit(&Winc::from(1000u64)));
    assert_eq!(
        db.audited_balance(&addr("OWNER")).await,
        owner.winc_balance,
    );

    let purchase = db.get_arns_purchase(&PurchaseId::new("P1")).await.unwrap();
    assert!(matches!(purchase.status, ArNsPurchaseStatus::Failed { .. }));
}

#[tokio::test]
async fn arns_purchase_success_keeps_the_debit() {
    let db = LedgerDb::new();
    fund(&db, "OWNER", 1000).await;

    db.create_arns_purchase_quote(purchase_quote("P2", "OWNER", 600))
        .await
        .unwrap();
    db.submit_arns_purchase(
        &PurchaseId::new("P2"),
        UserAddressType::Ario,
        MessageId::new("M2"),
        PaymentDirective::ListOrSigner,
        now(),
    )
    .await
    .unwrap();
    db.complete_arns_purchase(&PurchaseId::new("P2")).await.unwrap();

    let owner = db.get_user(&addr("OWNER")).await.unwrap();
    assert_eq!(owner.winc_balance, SignedWinc::credit(&Winc::from(400u64)));

    // Completing twice is a state error, not a double debit.
    let err = db
        .complete_arns_purchase(&PurchaseId::new("P2"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PurchaseInWrongState { .. }));
}

#[tokio::test]
async fn arns_purchase_can_be_paid_by_approval() {
    let db = LedgerDb::new();
    fund(&db, "BACKER", 1000).await;

    db.create_delegated_payment_approval(
        DataItemId::new("AP-ARNS"),
        &addr("BACKER"),
        &addr("NEW_OWNER"),
        &Winc::from(700u64),
        None,
        now(),
    )
    .await
    .unwrap();

    let mut purchase = purchase_quote("P3", "NEW_OWNER", 600);
    purchase.paid_by = vec![addr("BACKER")];
    db.create_arns_purchase_quote(purchase).await.unwrap();
    db.submit_arns_purchase(
        &PurchaseId::new("P3"),
        UserAddressType::Ario,
        MessageId::new("M3"),
        PaymentDirective::ListOnly,
        now(),
    )
    .await
    .unwrap();

    // The owner row was created as part of the purchase, at zero balance.
    let owner = db.get_user(&addr("NEW_OWNER")).await.unwrap();
    assert!(owner.winc_balance.is_zero());

    let approval = db
        .get_delegated_payment_approval(&DataItemId::new("AP-ARNS"))
        .await
        .unwrap();
    assert_eq!(approval.used_winc_amount, Winc::from(600u64));

    // Failure refunds the owner, not the backer.
    db.fail_arns_purchase(&PurchaseId::new("P3"), "timeout", now())
        .await
        .unwrap();
    let owner = db.get_user(&addr("NEW_OWNER")).await.unwrap();
    assert_eq!(owner.winc_balance, SignedWinc::credit(&Winc::from(600u64)));
    assert_eq!(
        db.audited_balance(&addr("NEW_OWNER")).await,
        owner.winc_balance,
    );
}

fn gift_quote(id: &str, email: &str, winc: u64) -> TopUpQuote {
    TopUpQuote {
        quote_id: QuoteId::new(id),
        destination_address: addr(email),
        destination_address_type: DestinationType::Email,
        payment_amount: dec!(25),
        quoted_payment_amount: dec!(25),
        currency_type: CurrencyType::new("usd"),
        winc_amount: Winc::from(winc),
        provider: PaymentProvider::new("stripe"),
        creation_date: now(),
        expiration_date: now() + Duration::from_secs(3600),
        gift_message: Some("happy uploading".to_owned()),
    }
}

#[tokio::test]
async fn gift_parks_credits_until_redeemed() {
    let db = LedgerDb::new();
    db.create_top_up_quote(gift_quote("QG1", "friend@example.com", 800), vec![])
        .await
        .unwrap();
    db.fulfill_quote(
        &QuoteId::new("QG1"),
        ReceiptId::new("RG1"),
        Some("sender@example.com".to_owned()),
        now(),
    )
    .await
    .unwrap();

    // No user exists yet; the credits sit in the gift.
    assert!(db.get_user(&addr("friend@example.com")).await.is_err());
    let gift = db
        .get_unredeemed_gift(&ReceiptId::new("RG1"))
        .await
        .unwrap();
    assert_eq!(gift.gifted_winc_amount, Winc::from(800u64));
    assert_eq!(gift.gift_message.as_deref(), Some("happy uploading"));

    let redeemed = db
        .redeem_gift(
            &ReceiptId::new("RG1"),
            "friend@example.com",
            &addr("FRIEND_ADDR"),
            UserAddressType::Arweave,
            now(),
        )
        .await
        .unwrap();
    assert_eq!(redeemed.destination_address, addr("FRIEND_ADDR"));

    let friend = db.get_user(&addr("FRIEND_ADDR")).await.unwrap();
    assert_eq!(friend.winc_balance, SignedWinc::credit(&Winc::from(800u64)));
    assert_eq!(
        db.audited_balance(&addr("FRIEND_ADDR")).await,
        friend.winc_balance,
    );

    // Second redemption fails.
    let err = db
        .redeem_gift(
            &ReceiptId::new("RG1"),
            "friend@example.com",
            &addr("OTHER_ADDR"),
            UserAddressType::Arweave,
            now(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::GiftAlreadyRedeemed(ReceiptId::new("RG1")),
    );
}

#[tokio::test]
async fn gift_redemption_requires_matching_email() {
    let db = LedgerDb::new();
    db.create_top_up_quote(gift_quote("QG2", "friend@example.com", 800), vec![])
        .await
        .unwrap();
    db.fulfill_quote(&QuoteId::new("QG2"), ReceiptId::new("RG2"), None, now())
        .await
        .unwrap();

    let err = db
        .redeem_gift(
            &ReceiptId::new("RG2"),
            "attacker@example.com",
            &addr("ATTACKER"),
            UserAddressType::Arweave,
            now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::BadRequest(_)));
}

#[tokio::test]
async fn expired_gifts_are_swept_for_refund() {
    let db = LedgerDb::new();
    db.create_top_up_quote(gift_quote("QG3", "slow@example.com", 500), vec![])
        .await
        .unwrap();
    db.fulfill_quote(&QuoteId::new("QG3"), ReceiptId::new("RG3"), None, now())
        .await
        .unwrap();

    // Not yet expired.
    assert!(db.expire_unredeemed_gifts(now()).await.is_empty());

    let far_future = now() + Duration::from_secs(2 * 365 * 24 * 3600);
    let expired = db.expire_unredeemed_gifts(far_future).await;
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].recipient_email, "slow@example.com");

    let err = db
        .redeem_gift(
            &ReceiptId::new("RG3"),
            "slow@example.com",
            &addr("SLOW_ADDR"),
            UserAddressType::Arweave,
            far_future,
        )
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::GiftNotFound(ReceiptId::new("RG3")));
}

#[tokio::test]
async fn chargeback_of_redeemed_gift_debits_the_redeemer() {
    let db = LedgerDb::new();
    db.create_top_up_quote(gift_quote("QG4", "friend@example.com", 500), vec![])
        .await
        .unwrap();
    db.fulfill_quote(&QuoteId::new("QG4"), ReceiptId::new("RG4"), None, now())
        .await
        .unwrap();
    db.redeem_gift(
        &ReceiptId::new("RG4"),
        "friend@example.com",
        &addr("FRIEND_ADDR"),
        UserAddressType::Arweave,
        now(),
    )
    .await
    .unwrap();

    db.chargeback(
        &QuoteId::new("QG4"),
        winc_common::ids::ChargebackId::new("CBG4"),
        "disputed",
        now(),
    )
    .await
    .unwrap();

    let friend = db.get_user(&addr("FRIEND_ADDR")).await.unwrap();
    assert!(friend.winc_balance.is_zero());
    assert_eq!(
        db.audited_balance(&addr("FRIEND_ADDR")).await,
        friend.winc_balance,
    );
}
