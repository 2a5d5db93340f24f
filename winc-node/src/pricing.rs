//! The pricing oracle seam.
//!
//! Rates (token to USD, USD to winc, ArNS name costs) come from external
//! oracles that are out of scope here; the service consumes them through
//! [`PricingService`]. [`FixedRatePricing`] is the in-process stand-in used
//! by tests and local development.

use async_trait::async_trait;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use winc_common::{
    address::TokenType,
    bytes::ByteCount,
    constants::{CHUNK_BYTE_SIZE, WINC_PER_CREDIT},
    winc::Winc,
};
use winc_ledger::entities::{ArNsIntent, CurrencyType};

#[async_trait]
pub trait PricingService: Send + Sync {
    /// Winc credited for a fiat payment.
    async fn fiat_to_winc(
        &self,
        amount: Decimal,
        currency: &CurrencyType,
    ) -> anyhow::Result<Winc>;

    /// Winc credited for `quantity` base units of `token_type`.
    async fn token_to_winc(
        &self,
        quantity: &Winc,
        token_type: TokenType,
    ) -> anyhow::Result<Winc>;

    /// Winc price of storing `byte_count` (callers round to chunk size).
    async fn bytes_to_winc(
        &self,
        byte_count: ByteCount,
    ) -> anyhow::Result<Winc>;

    /// Winc price of an ArNS name action.
    async fn arns_price(
        &self,
        name: &str,
        intent: ArNsIntent,
    ) -> anyhow::Result<Winc>;
}

/// Flat-rate pricing for tests and local development: 1 currency unit = 1
/// credit, 1 token base unit = 1 winc, 1 chunk = 1 credit, every name costs
/// 10 credits (permabuys 50).
pub struct FixedRatePricing;

#[async_trait]
impl PricingService for FixedRatePricing {
    async fn fiat_to_winc(
        &self,
        amount: Decimal,
        _currency: &CurrencyType,
    ) -> anyhow::Result<Winc> {
        let credits = amount
            .to_u64()
            .ok_or_else(|| anyhow::anyhow!("bad fiat amount: {amount}"))?;
        Ok(Winc::from(u128::from(credits) * u128::from(WINC_PER_CREDIT)))
    }

    async fn token_to_winc(
        &self,
        quantity: &Winc,
        _token_type: TokenType,
    ) -> anyhow::Result<Winc> {
        Ok(quantity.clone())
    }

    async fn bytes_to_winc(
        &self,
        byte_count: ByteCount,
    ) -> anyhow::Result<Winc> {
        let chunks = byte_count.round_to_chunk_size().as_u64() / CHUNK_BYTE_SIZE;
        Ok(Winc::from(
            u128::from(chunks) * u128::from(WINC_PER_CREDIT),
        ))
    }

    async fn arns_price(
        &self,
        _name: &str,
        intent: ArNsIntent,
    ) -> anyhow::Result<Winc> {
        let credits: u128 = match intent {
            ArNsIntent::LeaseName => 10,
            ArNsIntent::PermaBuyName => 50,
        };
        Ok(Winc::from(credits * u128::from(WINC_PER_CREDIT)))
    }
}
