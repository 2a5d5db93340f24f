//! The crypto credit pipeline.
//!
//! Scans pending payment transactions that have settled long enough, asks
//! the owning gateway whether they confirmed, and promotes or fails them.
//! One bad transaction never halts the batch: every promotion or failure is
//! its own store transaction, and per-transaction errors are logged and
//! skipped.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{info, instrument, warn};
use winc_common::{
    shutdown::ShutdownSignal,
    time::TimestampMs,
};
use winc_gateway::{GatewayError, GatewayMap, TxConfirmationStatus};
use winc_ledger::{entities::PendingPaymentTransaction, LedgerDb};

use crate::{
    config::Config,
    notify::{PaymentEvent, SharedSink},
};

/// Failure reason recorded when a confirmed transaction paid somewhere
/// other than a system deposit address.
pub const WRONG_DESTINATION_REASON: &str = "WrongDestination";
/// Failure reason recorded when a transaction never appeared within its
/// lifetime.
pub const NOT_FOUND_REASON: &str = "NotFound";

pub struct CreditPipeline {
    ledger: LedgerDb,
    gateways: GatewayMap,
    config: Arc<Config>,
    sink: SharedSink,
}

impl CreditPipeline {
    pub fn new(
        ledger: LedgerDb,
        gateways: GatewayMap,
        config: Arc<Config>,
        sink: SharedSink,
    ) -> Self {
        Self {
            ledger,
            gateways,
            config,
            sink,
        }
    }

    /// Runs until shutdown, sweeping once per configured interval.
    #[instrument(skip_all, name = "(credit-pipeline)")]
    pub async fn run(self, shutdown: ShutdownSignal) {
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.config.pipeline_interval) => {}
                () = shutdown.recv() => break,
            }
            if let Err(err) = self.run_once(TimestampMs::now()).await {
                warn!("credit pipeline sweep failed: {err:#}");
            }
        }
        info!("credit pipeline shut down");
    }

    /// One sweep over the settled pending set.
    pub async fn run_once(&self, now: TimestampMs) -> anyhow::Result<()> {
        let pending = self
            .ledger
            .get_pending_transactions_older_than(now)
            .await;

        for tx in pending {
            let settle_age = self.config.min_settle_age(tx.token_type);
            if now.saturating_duration_since(tx.created_date) < settle_age {
                continue;
            }
            if let Err(err) = self.process_transaction(&tx, now).await {
                warn!(
                    tx_id = %tx.tx_id,
                    token_type = %tx.token_type,
                    "failed to process pending transaction: {err:#}",
                );
            }
        }
        Ok(())
    }

    async fn process_transaction(
        &self,
        tx: &PendingPaymentTransaction,
        now: TimestampMs,
    ) -> anyhow::Result<()> {
        let gateway = self
            .gateways
            .get(tx.token_type)
            .ok_or_else(|| anyhow!("no gateway for {}", tx.token_type))?;

        let status = match gateway.get_transaction_status(&tx.tx_id).await {
            Ok(status) => status,
            // The chain itself rejected the transaction; it will never
            // credit, so fail the row now.
            Err(
                err @ (GatewayError::TransactionNotMined(_)
                | GatewayError::TransactionNotAPayment(_)),
            ) => {
                self.ledger
                    .fail_pending_transaction(
                        &tx.tx_id,
                        tx.token_type,
                        &err.to_string(),
                        now,
                    )
                    .await?;
                return Ok(());
            }
            Err(err) => return Err(err).context("status lookup failed"),
        };

        match status {
            TxConfirmationStatus::Confirmed { block_height } => {
                self.credit_confirmed(tx, block_height, now).await
            }
            TxConfirmationStatus::Pending => Ok(()),
            TxConfirmationStatus::NotFound => {
                let age = now.saturating_duration_since(tx.created_date);
                if age > self.config.pending_tx_max_lifetime {
                    self.ledger
                        .fail_pending_transaction(
                            &tx.tx_id,
                            tx.token_type,
                            NOT_FOUND_REASON,
                            now,
                        )
                        .await?;
                }
                Ok(())
            }
        }
    }

    async fn credit_confirmed(
        &self,
        tx: &PendingPaymentTransaction,
        block_height: u64,
        now: TimestampMs,
    ) -> anyhow::Result<()> {
        let gateway = self
            .gateways
            .get(tx.token_type)
            .expect("checked by process_transaction");
        let info = gateway
            .get_transaction(&tx.tx_id)
            .await?
            .ok_or_else(|| anyhow!("confirmed transaction has no details"))?;

        // Re-verify the recipient at credit time; the pending row may have
        // been created before the deposit address rotated.
        let expected_sink = self.config.sink_addresses.get(&tx.token_type);
        if expected_sink != Some(&info.recipient_address.to_string()) {
            self.ledger
                .fail_pending_transaction(
                    &tx.tx_id,
                    tx.token_type,
                    WRONG_DESTINATION_REASON,
                    now,
                )
                .await?;
            return Ok(());
        }

        let credited = self
            .ledger
            .credit_pending_transaction(
                &tx.tx_id,
                tx.token_type,
                block_height,
                now,
            )
            .await?;
        self.sink.notify(PaymentEvent::CryptoPaymentCredited {
            tx_id: tx.tx_id.clone(),
            token_type: tx.token_type,
            destination: credited.transaction.destination_address.clone(),
            winc_amount: credited.transaction.winc_amount.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use winc_common::{
        address::{DestinationType, TokenType, UserAddress, UserAddressType},
        ids::TxId,
        winc::{SignedWinc, Winc},
    };
    use winc_gateway::{Gateway, TransactionInfo};

    use super::*;
    use crate::notify::TracingSink;

    /// A gateway that always answers with fixed values.
    struct FixedGateway {
        status: TxConfirmationStatus,
        info: Option<TransactionInfo>,
    }

    #[async_trait]
    impl Gateway for FixedGateway {
        async fn get_transaction(
            &self,
            _tx_id: &TxId,
        ) -> Result<Option<TransactionInfo>, GatewayError> {
            Ok(self.info.clone())
        }

        async fn get_transaction_status(
            &self,
            _tx_id: &TxId,
        ) -> Result<TxConfirmationStatus, GatewayError> {
            Ok(self.status.clone())
        }

        fn endpoint(&self) -> &str {
            "fixed://test"
        }
    }

    fn now() -> TimestampMs {
        TimestampMs::from_millis(1_700_000_000_000).unwrap()
    }

    fn test_config() -> Config {
        let mut config = Config::from_env().unwrap();
        config.sink_addresses =
            HashMap::from([(TokenType::Arweave, "SINK".to_owned())]);
        config.min_settle_ages = HashMap::new();
        config
    }

    fn pending_tx(tx_id: &str, winc: u64) -> PendingPaymentTransaction {
        PendingPaymentTransaction {
            tx_id: TxId::new(tx_id),
            token_type: TokenType::Arweave,
            quantity: Winc::from(winc),
            winc_amount: Winc::from(winc),
            destination_address: UserAddress::new("PAYER"),
            destination_address_type: DestinationType::User(
                UserAddressType::Arweave,
            ),
            created_date: now(),
        }
    }

    fn pipeline_with(
        ledger: &LedgerDb,
        status: TxConfirmationStatus,
        recipient: &str,
    ) -> CreditPipeline {
        let mut gateways = GatewayMap::new();
        gateways.insert(
            TokenType::Arweave,
            Arc::new(FixedGateway {
                status,
                info: Some(TransactionInfo {
                    quantity: Winc::from(700u64),
                    sender_address: UserAddress::new("PAYER"),
                    recipient_address: UserAddress::new(recipient),
                }),
            }),
        );
        CreditPipeline::new(
            ledger.clone(),
            gateways,
            Arc::new(test_config()),
            Arc::new(TracingSink),
        )
    }

    #[tokio::test]
    async fn confirmed_transactions_are_credited() {
        let ledger = LedgerDb::new();
        ledger
            .create_pending_transaction(pending_tx("T1", 700))
            .await
            .unwrap();

        let pipeline = pipeline_with(
            &ledger,
            TxConfirmationStatus::Confirmed { block_height: 42 },
            "SINK",
        );
        pipeline.run_once(now()).await.unwrap();

        let user = ledger.get_user(&UserAddress::new("PAYER")).await.unwrap();
        assert_eq!(
            user.winc_balance,
            SignedWinc::credit(&Winc::from(700u64)),
        );
        let credited = ledger
            .get_credited_transaction(&TxId::new("T1"), TokenType::Arweave)
            .await
            .unwrap();
        assert_eq!(credited.block_height, 42);
    }

    #[tokio::test]
    async fn wrong_destination_fails_the_row() {
        let ledger = LedgerDb::new();
        ledger
            .create_pending_transaction(pending_tx("T2", 700))
            .await
            .unwrap();

        let pipeline = pipeline_with(
            &ledger,
            TxConfirmationStatus::Confirmed { block_height: 42 },
            "SOMEONE_ELSE",
        );
        pipeline.run_once(now()).await.unwrap();

        let failed = ledger
            .get_failed_transaction(&TxId::new("T2"), TokenType::Arweave)
            .await
            .unwrap();
        assert_eq!(failed.failed_reason, WRONG_DESTINATION_REASON);
        assert!(ledger.get_user(&UserAddress::new("PAYER")).await.is_err());
    }

    #[tokio::test]
    async fn pending_status_leaves_the_row_untouched() {
        let ledger = LedgerDb::new();
        ledger
            .create_pending_transaction(pending_tx("T3", 700))
            .await
            .unwrap();

        let pipeline =
            pipeline_with(&ledger, TxConfirmationStatus::Pending, "SINK");
        pipeline.run_once(now()).await.unwrap();

        assert!(ledger
            .get_pending_transaction(&TxId::new("T3"), TokenType::Arweave)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn not_found_past_lifetime_fails_the_row() {
        let ledger = LedgerDb::new();
        ledger
            .create_pending_transaction(pending_tx("T4", 700))
            .await
            .unwrap();

        let pipeline =
            pipeline_with(&ledger, TxConfirmationStatus::NotFound, "SINK");

        // Young transaction: left alone.
        pipeline.run_once(now()).await.unwrap();
        assert!(ledger
            .get_pending_transaction(&TxId::new("T4"), TokenType::Arweave)
            .await
            .is_some());

        // Past its lifetime: failed.
        let much_later =
            now() + test_config().pending_tx_max_lifetime * 2;
        pipeline.run_once(much_later).await.unwrap();
        let failed = ledger
            .get_failed_transaction(&TxId::new("T4"), TokenType::Arweave)
            .await
            .unwrap();
        assert_eq!(failed.failed_reason, NOT_FOUND_REASON);
    }
}
