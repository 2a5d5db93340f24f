//! EVM-family gateway adapter (Ethereum, Base, Matic/Pol), speaking
//! JSON-RPC to a provider endpoint.
//!
//! A transaction is confirmed once its receipt is `min_confirmations` blocks
//! deep; a transaction visible in the pool without a receipt is pending.

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use winc_common::{address::UserAddress, ids::TxId, winc::Winc};

use crate::{
    error::GatewayError, Gateway, TransactionInfo, TxConfirmationStatus,
};

pub const DEFAULT_MIN_CONFIRMATIONS: u32 = 5;

pub struct EvmGateway {
    client: reqwest::Client,
    endpoint: String,
    min_confirmations: u32,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    from: String,
    /// Absent for contract creation.
    to: Option<String>,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    block_number: String,
}

impl EvmGateway {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        min_confirmations: u32,
    ) -> Self {
        Self {
            client,
            endpoint,
            min_confirmations,
        }
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, GatewayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<JsonRpcResponse<T>>()
            .await?;

        if let Some(error) = response.error {
            return Err(GatewayError::BadResponse(format!(
                "rpc error {}: {}",
                error.code, error.message,
            )));
        }
        Ok(response.result)
    }
}

#[async_trait]
impl Gateway for EvmGateway {
    async fn get_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<TransactionInfo>, GatewayError> {
        let tx = self
            .rpc::<RpcTransaction>(
                "eth_getTransactionByHash",
                json!([tx_id.as_str()]),
            )
            .await?;
        let Some(tx) = tx else {
            return Ok(None);
        };

        let recipient = tx.to.ok_or_else(|| {
            GatewayError::TransactionNotAPayment(tx_id.clone())
        })?;
        Ok(Some(TransactionInfo {
            quantity: parse_hex_quantity(&tx.value)?,
            sender_address: UserAddress::new(tx.from.to_lowercase()),
            recipient_address: UserAddress::new(recipient.to_lowercase()),
        }))
    }

    async fn get_transaction_status(
        &self,
        tx_id: &TxId,
    ) -> Result<TxConfirmationStatus, GatewayError> {
        let receipt = self
            .rpc::<RpcReceipt>(
                "eth_getTransactionReceipt",
                json!([tx_id.as_str()]),
            )
            .await?;

        let Some(receipt) = receipt else {
            // No receipt yet. If the pool knows the transaction it is
            // pending; otherwise it is simply not found.
            let tx = self
                .rpc::<RpcTransaction>(
                    "eth_getTransactionByHash",
                    json!([tx_id.as_str()]),
                )
                .await?;
            return Ok(match tx {
                Some(_) => TxConfirmationStatus::Pending,
                None => TxConfirmationStatus::NotFound,
            });
        };

        let tx_block = parse_hex_u64(&receipt.block_number)?;
        let latest_hex = self
            .rpc::<String>("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| {
                GatewayError::BadResponse(
                    "eth_blockNumber returned null".to_owned(),
                )
            })?;
        let latest = parse_hex_u64(&latest_hex)?;

        Ok(confirmation_status(tx_block, latest, self.min_confirmations))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn confirmation_status(
    tx_block: u64,
    latest_block: u64,
    min_confirmations: u32,
) -> TxConfirmationStatus {
    let confirmations = latest_block.saturating_sub(tx_block) + 1;
    if confirmations >= u64::from(min_confirmations) {
        TxConfirmationStatus::Confirmed {
            block_height: tx_block,
        }
    } else {
        TxConfirmationStatus::Pending
    }
}

fn parse_hex_u64(s: &str) -> Result<u64, GatewayError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|_| {
        GatewayError::BadResponse(format!("bad hex number: {s:?}"))
    })
}

fn parse_hex_quantity(s: &str) -> Result<Winc, GatewayError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .map(Winc::from)
        .ok_or_else(|| {
            GatewayError::BadResponse(format!("bad hex quantity: {s:?}"))
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn confirmation_depth() {
        // Mined in block 100, tip at 103: 4 confirmations.
        assert_eq!(
            confirmation_status(100, 103, 5),
            TxConfirmationStatus::Pending,
        );
        // Tip at 104: 5 confirmations.
        assert_eq!(
            confirmation_status(100, 104, 5),
            TxConfirmationStatus::Confirmed { block_height: 100 },
        );
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_u64("0x10").unwrap(), 16);
        assert_eq!(
            parse_hex_quantity("0xde0b6b3a7640000").unwrap(),
            Winc::from(1_000_000_000_000_000_000u64),
        );
        assert!(parse_hex_u64("0xnope").is_err());
    }

    #[test]
    fn transaction_parses() {
        let raw = r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "from": "0xAbC0000000000000000000000000000000000001",
                "to": "0xDef0000000000000000000000000000000000002",
                "value": "0x2386f26fc10000"
            }
        }"#;
        let response =
            serde_json::from_str::<JsonRpcResponse<RpcTransaction>>(raw)
                .unwrap();
        let tx = response.result.unwrap();
        assert_eq!(tx.value, "0x2386f26fc10000");
        assert!(tx.to.is_some());
    }
}
