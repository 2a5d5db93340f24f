//! The expiry sweeper.
//!
//! Periodically fails expired top-up quotes, archives expired delegated
//! approvals (refunding their unused remainders), and sweeps expired
//! unredeemed gifts into the refund path.

use tracing::{info, instrument, warn};
use winc_common::{
    shutdown::ShutdownSignal,
    time::TimestampMs,
};
use winc_ledger::LedgerDb;

use std::time::Duration;

use crate::notify::{PaymentEvent, SharedSink};

pub struct ExpirySweeper {
    ledger: LedgerDb,
    sink: SharedSink,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(
        ledger: LedgerDb,
        sink: SharedSink,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            sink,
            interval,
        }
    }

    /// Runs until shutdown, sweeping once per interval.
    #[instrument(skip_all, name = "(expiry-sweeper)")]
    pub async fn run(self, shutdown: ShutdownSignal) {
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = shutdown.recv() => break,
            }
            self.run_once(TimestampMs::now()).await;
        }
        info!("expiry sweeper shut down");
    }

    /// One sweep. Nothing here can fail the loop; sweep errors are logged
    /// and retried next interval.
    pub async fn run_once(&self, now: TimestampMs) {
        let failed_quotes = self.ledger.fail_expired_quotes(now).await;
        if !failed_quotes.is_empty() {
            info!(count = failed_quotes.len(), "expired top-up quotes");
        }

        let expired_approvals =
            self.ledger.expire_delegated_payment_approvals(now).await;
        if !expired_approvals.is_empty() {
            info!(
                count = expired_approvals.len(),
                "expired delegated payment approvals",
            );
        }

        let expired_gifts = self.ledger.expire_unredeemed_gifts(now).await;
        for gift in expired_gifts {
            warn!(
                email = %gift.recipient_email,
                amount = %gift.gifted_winc_amount,
                "gift expired unredeemed; queueing refund",
            );
            self.sink.notify(PaymentEvent::GiftExpired {
                recipient_email: gift.recipient_email,
                winc_amount: gift.gifted_winc_amount,
            });
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use winc_common::{
        address::{DestinationType, UserAddress, UserAddressType},
        ids::{DataItemId, QuoteId},
        time::TimestampMs,
        winc::{SignedWinc, Winc},
    };
    use winc_ledger::entities::{CurrencyType, PaymentProvider, TopUpQuote};

    use super::*;
    use crate::notify::TracingSink;

    fn now() -> TimestampMs {
        TimestampMs::from_millis(1_700_000_000_000).unwrap()
    }

    fn sweeper(ledger: &LedgerDb) -> ExpirySweeper {
        ExpirySweeper::new(
            ledger.clone(),
            Arc::new(TracingSink),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn sweeps_expired_quotes_and_approvals() {
        let ledger = LedgerDb::new();

        let expired_quote = TopUpQuote {
            quote_id: QuoteId::new("QS1"),
            destination_address: UserAddress::new("A"),
            destination_address_type: DestinationType::User(
                UserAddressType::Arweave,
            ),
            payment_amount: dec!(10),
            quoted_payment_amount: dec!(10),
            currency_type: CurrencyType::new("usd"),
            winc_amount: Winc::from(100u64),
            provider: PaymentProvider::new("stripe"),
            creation_date: now(),
            expiration_date: now(),
            gift_message: None,
        };
        ledger
            .create_top_up_quote(expired_quote, vec![])
            .await
            .unwrap();

        ledger
            .add_credits_bypassed(
                &UserAddress::new("PAYER"),
                UserAddressType::Arweave,
                &Winc::from(1000u64),
                now(),
            )
            .await
            .unwrap();
        ledger
            .create_delegated_payment_approval(
                DataItemId::new("AP-SWEEP"),
                &UserAddress::new("PAYER"),
                &UserAddress::new("SPENDER"),
                &Winc::from(400u64),
                Some(Duration::from_secs(1)),
                now(),
            )
            .await
            .unwrap();

        let later = now() + Duration::from_secs(10);
        sweeper(&ledger).run_once(later).await;

        // The quote can no longer be fulfilled.
        assert!(ledger
            .fulfill_quote(
                &QuoteId::new("QS1"),
                winc_common::ids::ReceiptId::new("R"),
                None,
                later,
            )
            .await
            .is_err());

        // The approval was archived and its remainder refunded.
        assert!(ledger
            .get_delegated_payment_approval(&DataItemId::new("AP-SWEEP"))
            .await
            .is_err());
        let payer =
            ledger.get_user(&UserAddress::new("PAYER")).await.unwrap();
        assert_eq!(
            payer.winc_balance,
            SignedWinc::credit(&Winc::from(1000u64)),
        );
    }
}
