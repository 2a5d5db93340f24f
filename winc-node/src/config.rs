//! Process configuration, read from the environment with explicit parsing
//! and a usable default for every knob.

use std::{collections::HashMap, time::Duration};

use anyhow::Context;
use winc_common::address::TokenType;

/// Confirmation depth used for chains without a specific override.
pub const DEFAULT_MIN_CONFIRMATIONS: u32 = 5;
/// Arweave blocks are slow but shallow reorgs are common; wait deeper.
pub const DEFAULT_ARWEAVE_MIN_CONFIRMATIONS: u32 = 18;
pub const DEFAULT_POLLING_WAIT_MS: u64 = 500;
pub const DEFAULT_MAX_POLLING_ATTEMPTS: u32 = 5;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_PIPELINE_INTERVAL_SECS: u64 = 30;
/// Pending transactions that never confirm are failed after this long.
pub const DEFAULT_PENDING_TX_MAX_LIFETIME_SECS: u64 = 60 * 60 * 24 * 2;
pub const DEFAULT_ARIO_LEASE_NAME_DUST_AMOUNT: u64 = 1;
pub const DEFAULT_ARIO_PERMA_BUY_NAME_DUST_AMOUNT: u64 = 5;

#[derive(Clone, Debug)]
pub struct Config {
    // --- Confirmation thresholds --- //
    pub default_min_confirmations: u32,
    pub arweave_min_confirmations: u32,
    pub ethereum_min_confirmations: u32,
    pub base_eth_min_confirmations: u32,

    // --- Gateway polling --- //
    pub payment_tx_polling_wait: Duration,
    pub max_payment_tx_polling_attempts: u32,

    // --- Gateway endpoints --- //
    pub arweave_gateway_url: String,
    pub ethereum_rpc_url: String,
    pub base_eth_rpc_url: String,
    pub matic_rpc_url: String,
    pub solana_rpc_url: String,
    pub kyve_rest_url: String,

    // --- AO / ARIO --- //
    pub ario_process_id: String,
    pub cu_url: String,
    pub ario_lease_name_dust_amount: u64,
    pub ario_perma_buy_name_dust_amount: u64,

    // --- Database (consumed by the out-of-scope persistence host) --- //
    pub db_writer_endpoint: String,
    pub db_reader_endpoint: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_password: String,

    // --- Auth --- //
    pub jwt_secret: String,

    // --- Notifications --- //
    pub slack_oauth_token: Option<String>,
    pub slack_channel_id: Option<String>,

    // --- Background workers --- //
    pub sweep_interval: Duration,
    pub pipeline_interval: Duration,
    pub pending_tx_max_lifetime: Duration,

    /// The system-controlled deposit address per token; confirmed payments
    /// to any other recipient are failed with `WrongDestination`.
    pub sink_addresses: HashMap<TokenType, String>,
    /// How long a pending transaction must sit before the pipeline starts
    /// polling its status.
    pub min_settle_ages: HashMap<TokenType, Duration>,
}

impl Config {
    /// Reads the configuration from the environment; every missing variable
    /// falls back to its default.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            default_min_confirmations: parse_env(
                "DEFAULT_MIN_CONFIRMATIONS",
                DEFAULT_MIN_CONFIRMATIONS,
            )?,
            arweave_min_confirmations: parse_env(
                "ARWEAVE_MIN_CONFIRMATIONS",
                DEFAULT_ARWEAVE_MIN_CONFIRMATIONS,
            )?,
            ethereum_min_confirmations: parse_env(
                "ETHEREUM_MIN_CONFIRMATIONS",
                DEFAULT_MIN_CONFIRMATIONS,
            )?,
            base_eth_min_confirmations: parse_env(
                "BASE_ETH_MIN_CONFIRMATIONS",
                DEFAULT_MIN_CONFIRMATIONS,
            )?,
            payment_tx_polling_wait: Duration::from_millis(parse_env(
                "PAYMENT_TX_POLLING_WAIT_TIME_MS",
                DEFAULT_POLLING_WAIT_MS,
            )?),
            max_payment_tx_polling_attempts: parse_env(
                "MAX_PAYMENT_TX_POLLING_ATTEMPTS",
                DEFAULT_MAX_POLLING_ATTEMPTS,
            )?,
            arweave_gateway_url: string_env(
                "ARWEAVE_GATEWAY",
                "https://arweave.net",
            ),
            ethereum_rpc_url: string_env(
                "ETHEREUM_RPC_URL",
                "https://cloudflare-eth.com",
            ),
            base_eth_rpc_url: string_env(
                "BASE_ETH_RPC_URL",
                "https://mainnet.base.org",
            ),
            matic_rpc_url: string_env(
                "MATIC_RPC_URL",
                "https://polygon-rpc.com",
            ),
            solana_rpc_url: string_env(
                "SOLANA_RPC_URL",
                "https://api.mainnet-beta.solana.com",
            ),
            kyve_rest_url: string_env(
                "KYVE_REST_URL",
                "https://api.kyve.network",
            ),
            ario_process_id: string_env("ARIO_PROCESS_ID", ""),
            cu_url: string_env("CU_URL", "https://cu.ao-testnet.xyz"),
            ario_lease_name_dust_amount: parse_env(
                "ARIO_LEASE_NAME_DUST_AMOUNT",
                DEFAULT_ARIO_LEASE_NAME_DUST_AMOUNT,
            )?,
            ario_perma_buy_name_dust_amount: parse_env(
                "ARIO_PERMA_BUY_NAME_DUST_AMOUNT",
                DEFAULT_ARIO_PERMA_BUY_NAME_DUST_AMOUNT,
            )?,
            db_writer_endpoint: string_env("DB_WRITER_ENDPOINT", ""),
            db_reader_endpoint: string_env("DB_READER_ENDPOINT", ""),
            db_host: string_env("DB_HOST", "localhost"),
            db_port: parse_env("DB_PORT", 5432)?,
            db_password: string_env("DB_PASSWORD", ""),
            jwt_secret: string_env("JWT_SECRET", ""),
            slack_oauth_token: optional_env("SLACK_OAUTH_TOKEN"),
            slack_channel_id: optional_env("SLACK_CHANNEL_ID"),
            sweep_interval: Duration::from_secs(parse_env(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?),
            pipeline_interval: Duration::from_secs(parse_env(
                "PIPELINE_INTERVAL_SECS",
                DEFAULT_PIPELINE_INTERVAL_SECS,
            )?),
            pending_tx_max_lifetime: Duration::from_secs(parse_env(
                "PENDING_TX_MAX_LIFETIME_SECS",
                DEFAULT_PENDING_TX_MAX_LIFETIME_SECS,
            )?),
            sink_addresses: sink_addresses_from_env(),
            min_settle_ages: default_min_settle_ages(),
        })
    }

    pub fn min_confirmations(&self, token_type: TokenType) -> u32 {
        match token_type {
            TokenType::Arweave => self.arweave_min_confirmations,
            TokenType::Ethereum => self.ethereum_min_confirmations,
            TokenType::BaseEth => self.base_eth_min_confirmations,
            _ => self.default_min_confirmations,
        }
    }

    pub fn min_settle_age(&self, token_type: TokenType) -> Duration {
        self.min_settle_ages
            .get(&token_type)
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// `{TOKEN}_SINK_ADDRESS` per token type, e.g. `ARWEAVE_SINK_ADDRESS`.
fn sink_addresses_from_env() -> HashMap<TokenType, String> {
    TokenType::ALL
        .into_iter()
        .filter_map(|token_type| {
            let var = format!(
                "{}_SINK_ADDRESS",
                token_type.to_string().replace('-', "_").to_uppercase(),
            );
            optional_env(&var).map(|address| (token_type, address))
        })
        .collect()
}

/// EVM chains get a settle delay so receipts stop moving under us; fast or
/// instant-finality chains are polled immediately.
fn default_min_settle_ages() -> HashMap<TokenType, Duration> {
    let minute = Duration::from_secs(60);
    HashMap::from([
        (TokenType::Ethereum, minute),
        (TokenType::BaseEth, minute),
        (TokenType::Matic, minute),
        (TokenType::Pol, minute),
    ])
}

fn string_env(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_owned())
}

fn optional_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(
    var: &str,
    default: T,
) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {var}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
