//! Gateway adapters for the chains the service accepts payment on.
//!
//! Each adapter answers two questions about a transaction id: "what is it?"
//! ([`Gateway::get_transaction`]) and "has it settled?"
//! ([`Gateway::get_transaction_status`]). Status is always clamped to the
//! tri-state [`TxConfirmationStatus`]; per-chain notions like commitment
//! levels and confirmation depth never leak past the adapter.

pub mod ario;
pub mod arweave;
pub mod error;
pub mod evm;
pub mod kyve;
pub mod poller;
pub mod solana;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use winc_common::{
    address::{TokenType, UserAddress},
    ids::TxId,
    winc::Winc,
};

pub use error::GatewayError;

/// A verified on-chain payment: how much, from whom, to whom. Quantities are
/// in the token's base units.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionInfo {
    pub quantity: Winc,
    pub sender_address: UserAddress,
    pub recipient_address: UserAddress,
}

/// Settlement status, clamped to three states. `NotFound` is not an error:
/// the transaction may simply not have propagated yet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxConfirmationStatus {
    Confirmed { block_height: u64 },
    Pending,
    NotFound,
}

/// One chain's data source.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetches the payment details of a transaction. `Ok(None)` means the
    /// transaction is not (yet) visible.
    async fn get_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<TransactionInfo>, GatewayError>;

    /// Fetches the settlement status of a transaction.
    async fn get_transaction_status(
        &self,
        tx_id: &TxId,
    ) -> Result<TxConfirmationStatus, GatewayError>;

    /// The endpoint this adapter talks to, for logs and diagnostics.
    fn endpoint(&self) -> &str;
}

/// Adapters keyed by token type. Plain values in a map; dispatch is by
/// lookup, not by knowing chain internals.
#[derive(Clone, Default)]
pub struct GatewayMap {
    gateways: HashMap<TokenType, Arc<dyn Gateway>>,
}

impl GatewayMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        token_type: TokenType,
        gateway: Arc<dyn Gateway>,
    ) {
        self.gateways.insert(token_type, gateway);
    }

    pub fn get(&self, token_type: TokenType) -> Option<&Arc<dyn Gateway>> {
        self.gateways.get(&token_type)
    }

    pub fn token_types(&self) -> impl Iterator<Item = TokenType> + '_ {
        self.gateways.keys().copied()
    }
}

/// Parses a decimal base-unit quantity string into winc-scale units.
pub(crate) fn parse_quantity(s: &str) -> Result<Winc, GatewayError> {
    s.parse::<Winc>().map_err(|_| {
        GatewayError::BadResponse(format!("bad quantity string: {s:?}"))
    })
}
