//! The public payment service surface.
//!
//! [`PaymentService`] owns the ledger, the gateway map, the pricing seam,
//! and the process-local caches. The HTTP layer (out of scope) calls these
//! methods and maps errors to statuses via
//! [`ToHttpStatus`](winc_ledger::error::ToHttpStatus).

use std::{sync::Arc, time::Duration};

use http::StatusCode;
use rust_decimal::Decimal;
use tracing::instrument;
use winc_common::{
    address::{DestinationType, TokenType, UserAddress, UserAddressType},
    bytes::ByteCount,
    constants::TOP_UP_QUOTE_TTL_SECS,
    ids::{DataItemId, MessageId, PurchaseId, QuoteId, ReceiptId, ReservationId, TxId},
    shutdown::ShutdownSignal,
    time::TimestampMs,
};
use winc_gateway::{
    poller::{poll_gateway, PollingConfig},
    GatewayError, GatewayMap, TxConfirmationStatus,
};
use winc_ledger::{
    adjustments::{apply_payment_adjustments, apply_upload_adjustments},
    entities::{
        AdjustmentCatalog, ArNsIntent, ArNsPurchase, ArNsPurchaseStatus,
        BalanceReservation, CurrencyType, PaymentProvider, PaymentReceipt,
        PendingPaymentTransaction, TopUpQuote,
    },
    error::ToHttpStatus,
    reserve::{PaymentDirective, ReserveParams},
    store::Balance,
    LedgerDb, LedgerError,
};

use crate::{
    config::Config,
    notify::{PaymentEvent, SharedSink},
    pricing::PricingService,
    ttl_cache::{TtlCache, DEFAULT_CAPACITY},
};

/// How long a cached transaction status may be served.
const STATUS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("transaction {tx_id} did not pay a system deposit address")]
    WrongDestination { tx_id: TxId },

    #[error("no gateway configured for token type {0}")]
    UnsupportedToken(TokenType),

    #[error("pricing failed: {0:#}")]
    Pricing(#[source] anyhow::Error),
}

impl ToHttpStatus for ServiceError {
    fn to_http_status(&self) -> StatusCode {
        match self {
            Self::Ledger(err) => err.to_http_status(),
            Self::Gateway(err) => match err {
                GatewayError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
                GatewayError::TransactionNotMined(_)
                | GatewayError::TransactionNotAPayment(_) =>
                    StatusCode::BAD_REQUEST,
                GatewayError::Cancelled
                | GatewayError::Http(_)
                | GatewayError::BadResponse(_) => StatusCode::BAD_GATEWAY,
            },
            Self::WrongDestination { .. } | Self::UnsupportedToken(_) =>
                StatusCode::BAD_REQUEST,
            Self::Pricing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Everything needed to open a top-up quote.
#[derive(Clone, Debug)]
pub struct QuoteRequest {
    pub quote_id: QuoteId,
    pub destination_address: UserAddress,
    pub destination_address_type: DestinationType,
    pub payment_amount: Decimal,
    pub currency_type: CurrencyType,
    pub provider: PaymentProvider,
    pub promo_codes: Vec<String>,
    pub gift_message: Option<String>,
}

#[derive(Clone)]
pub struct PaymentService {
    ledger: LedgerDb,
    gateways: GatewayMap,
    pricing: Arc<dyn PricingService>,
    sink: SharedSink,
    payment_catalogs: Arc<Vec<AdjustmentCatalog>>,
    upload_catalogs: Arc<Vec<AdjustmentCatalog>>,
    status_cache: Arc<TtlCache<(TxId, TokenType), TxConfirmationStatus>>,
    config: Arc<Config>,
    shutdown: ShutdownSignal,
}

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: LedgerDb,
        gateways: GatewayMap,
        pricing: Arc<dyn PricingService>,
        sink: SharedSink,
        payment_catalogs: Vec<AdjustmentCatalog>,
        upload_catalogs: Vec<AdjustmentCatalog>,
        config: Arc<Config>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            ledger,
            gateways,
            pricing,
            sink,
            payment_catalogs: Arc::new(payment_catalogs),
            upload_catalogs: Arc::new(upload_catalogs),
            status_cache: Arc::new(TtlCache::new(
                DEFAULT_CAPACITY,
                STATUS_CACHE_TTL,
            )),
            config,
            shutdown,
        }
    }

    /// Direct access to the ledger store; the service only wraps the calls
    /// that need gateways, pricing, or notification.
    pub fn ledger(&self) -> &LedgerDb {
        &self.ledger
    }

    fn polling_config(&self) -> PollingConfig {
        PollingConfig {
            initial_wait: self.config.payment_tx_polling_wait,
            max_attempts: self.config.max_payment_tx_polling_attempts,
        }
    }

    // --- Quotes --- //

    /// Prices and records a top-up quote: applies payment adjustments to the
    /// quoted fiat amount, converts the adjusted amount to winc, and inserts
    /// the quote.
    #[instrument(skip_all, name = "(price-quote)")]
    pub async fn price_quote(
        &self,
        request: QuoteRequest,
        now: TimestampMs,
    ) -> Result<TopUpQuote, ServiceError> {
        let used_catalogs = self
            .ledger
            .payment_catalogs_used_by(&request.destination_address)
            .await;
        let price = apply_payment_adjustments(
            request.payment_amount,
            &request.promo_codes,
            |catalog_id| used_catalogs.contains(catalog_id),
            &self.payment_catalogs,
            now,
        );

        let winc_amount = self
            .pricing
            .fiat_to_winc(price.final_amount, &request.currency_type)
            .await
            .map_err(ServiceError::Pricing)?;

        let quote = TopUpQuote {
            quote_id: request.quote_id,
            destination_address: request.destination_address,
            destination_address_type: request.destination_address_type,
            payment_amount: price.final_amount,
            quoted_payment_amount: request.payment_amount,
            currency_type: request.currency_type,
            winc_amount,
            provider: request.provider,
            creation_date: now,
            expiration_date: now
                + Duration::from_secs(TOP_UP_QUOTE_TTL_SECS),
            gift_message: request.gift_message,
        };
        self.ledger
            .create_top_up_quote(quote.clone(), price.applied)
            .await?;
        Ok(quote)
    }

    /// Fulfills a quote once the provider confirms the charge, and tells the
    /// notification sink. The sink is best-effort; the credit committed
    /// regardless.
    pub async fn fulfill_quote(
        &self,
        quote_id: &QuoteId,
        receipt_id: ReceiptId,
        sender_email: Option<String>,
        now: TimestampMs,
    ) -> Result<PaymentReceipt, ServiceError> {
        let receipt = self
            .ledger
            .fulfill_quote(quote_id, receipt_id, sender_email, now)
            .await?;
        self.sink.notify(PaymentEvent::QuoteFulfilled {
            quote_id: quote_id.clone(),
            destination: receipt.quote.destination_address.clone(),
            winc_amount: receipt.quote.winc_amount.clone(),
        });
        Ok(receipt)
    }

    // --- Crypto top-ups --- //

    /// Handles a user-submitted transaction id: polls the gateway until the
    /// transaction is visible, checks it paid one of our deposit addresses,
    /// prices it, and records it as pending. The credit pipeline promotes it
    /// once confirmed.
    #[instrument(skip_all, name = "(top-up-with-tx)", fields(%tx_id))]
    pub async fn top_up_with_crypto_tx(
        &self,
        tx_id: TxId,
        token_type: TokenType,
        now: TimestampMs,
    ) -> Result<PendingPaymentTransaction, ServiceError> {
        let gateway = self
            .gateways
            .get(token_type)
            .ok_or(ServiceError::UnsupportedToken(token_type))?;

        let info = poll_gateway(
            &tx_id,
            || gateway.get_transaction(&tx_id),
            self.polling_config(),
            &self.shutdown,
        )
        .await?;

        let expected_sink = self.config.sink_addresses.get(&token_type);
        if expected_sink != Some(&info.recipient_address.to_string()) {
            return Err(ServiceError::WrongDestination { tx_id });
        }

        let winc_amount = self
            .pricing
            .token_to_winc(&info.quantity, token_type)
            .await
            .map_err(ServiceError::Pricing)?;

        let pending = PendingPaymentTransaction {
            tx_id,
            token_type,
            quantity: info.quantity,
            winc_amount,
            // The payer gets the credits.
            destination_address: info.sender_address,
            destination_address_type: DestinationType::User(
                token_type.address_type(),
            ),
            created_date: now,
        };
        Ok(self.ledger.create_pending_transaction(pending).await?)
    }

    /// Gateway transaction status, cached for a few minutes per tx.
    pub async fn get_transaction_status(
        &self,
        tx_id: &TxId,
        token_type: TokenType,
        now: TimestampMs,
    ) -> Result<TxConfirmationStatus, ServiceError> {
        let key = (tx_id.clone(), token_type);
        if let Some(status) = self.status_cache.get(&key, now) {
            return Ok(status);
        }

        let gateway = self
            .gateways
            .get(token_type)
            .ok_or(ServiceError::UnsupportedToken(token_type))?;
        let status = gateway.get_transaction_status(tx_id).await?;
        self.status_cache.insert(key, status.clone(), now);
        Ok(status)
    }

    // --- Uploads --- //

    /// Prices an upload (chunk-rounded network price, then upload
    /// adjustments) and reserves the winc against the signer and any listed
    /// payers.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, name = "(reserve-upload)", fields(%data_item_id))]
    pub async fn reserve_upload(
        &self,
        data_item_id: DataItemId,
        reservation_id: ReservationId,
        signer_address: UserAddress,
        signer_address_type: UserAddressType,
        byte_count: ByteCount,
        paid_by: Vec<UserAddress>,
        directive: PaymentDirective,
        now: TimestampMs,
    ) -> Result<BalanceReservation, ServiceError> {
        let network_winc = self
            .pricing
            .bytes_to_winc(byte_count.round_to_chunk_size())
            .await
            .map_err(ServiceError::Pricing)?;
        let price = apply_upload_adjustments(
            &network_winc,
            Some(byte_count),
            &self.upload_catalogs,
            None,
            now,
        );

        let params = ReserveParams {
            reservation_id,
            data_item_id,
            signer_address,
            signer_address_type,
            reserved_winc: price.final_winc,
            network_winc,
            adjustments: price.applied,
            paid_by,
            directive,
        };
        Ok(self.ledger.create_balance_reservation(params, now).await?)
    }

    // --- ArNS --- //

    /// Prices a name action and records the purchase quote.
    #[allow(clippy::too_many_arguments)]
    pub async fn price_arns_purchase(
        &self,
        purchase_id: PurchaseId,
        owner_address: UserAddress,
        name: String,
        intent: ArNsIntent,
        paid_by: Vec<UserAddress>,
        now: TimestampMs,
    ) -> Result<ArNsPurchase, ServiceError> {
        let winc_amount = self
            .pricing
            .arns_price(&name, intent)
            .await
            .map_err(ServiceError::Pricing)?;
        let dust_mario_amount = match intent {
            ArNsIntent::LeaseName => self.config.ario_lease_name_dust_amount,
            ArNsIntent::PermaBuyName =>
                self.config.ario_perma_buy_name_dust_amount,
        };

        let purchase = ArNsPurchase {
            purchase_id,
            owner_address,
            name,
            intent,
            winc_amount,
            dust_mario_amount,
            created_date: now,
            status: ArNsPurchaseStatus::Quote,
            paid_by,
        };
        self.ledger.create_arns_purchase_quote(purchase.clone()).await?;
        Ok(purchase)
    }

    /// Debits the owner and marks the purchase pending under `message_id`.
    pub async fn submit_arns_purchase(
        &self,
        purchase_id: &PurchaseId,
        owner_address_type: UserAddressType,
        message_id: MessageId,
        directive: PaymentDirective,
        now: TimestampMs,
    ) -> Result<ArNsPurchase, ServiceError> {
        Ok(self
            .ledger
            .submit_arns_purchase(
                purchase_id,
                owner_address_type,
                message_id,
                directive,
                now,
            )
            .await?)
    }

    // --- Balances --- //

    pub async fn get_balance(
        &self,
        address: &UserAddress,
    ) -> Result<Balance, ServiceError> {
        Ok(self.ledger.get_balance(address).await?)
    }
}
