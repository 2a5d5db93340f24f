//! Solana gateway adapter.
//!
//! Commitment levels map onto the tri-state: `finalized` is confirmed,
//! `confirmed` is pending, anything less is not found. The paid quantity is
//! the recipient account's balance delta (`post_balances[1] -
//! pre_balances[1]`), which also covers transfers built with extra
//! instructions.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use winc_common::{address::UserAddress, ids::TxId, winc::Winc};

use crate::{
    error::GatewayError, Gateway, TransactionInfo, TxConfirmationStatus,
};

pub struct SolanaGateway {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<RpcTransaction>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    slot: u64,
    meta: RpcMeta,
    transaction: RpcTransactionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcMeta {
    pre_balances: Vec<u64>,
    post_balances: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct RpcTransactionBody {
    message: RpcMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcMessage {
    account_keys: Vec<String>,
}

impl SolanaGateway {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    async fn get_with_commitment(
        &self,
        tx_id: &TxId,
        commitment: &str,
    ) -> Result<Option<RpcTransaction>, GatewayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTransaction",
            "params": [tx_id.as_str(), {
                "commitment": commitment,
                "encoding": "json",
                "maxSupportedTransactionVersion": 0,
            }],
        });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<RpcResponse>()
            .await?;

        if let Some(error) = response.error {
            return Err(GatewayError::BadResponse(format!(
                "solana rpc error: {error}",
            )));
        }
        Ok(response.result)
    }
}

#[async_trait]
impl Gateway for SolanaGateway {
    async fn get_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<TransactionInfo>, GatewayError> {
        let Some(tx) = self.get_with_commitment(tx_id, "finalized").await?
        else {
            return Ok(None);
        };
        transaction_info(tx_id, &tx).map(Some)
    }

    async fn get_transaction_status(
        &self,
        tx_id: &TxId,
    ) -> Result<TxConfirmationStatus, GatewayError> {
        if let Some(tx) =
            self.get_with_commitment(tx_id, "finalized").await?
        {
            return Ok(TxConfirmationStatus::Confirmed {
                block_height: tx.slot,
            });
        }
        if self
            .get_with_commitment(tx_id, "confirmed")
            .await?
            .is_some()
        {
            return Ok(TxConfirmationStatus::Pending);
        }
        Ok(TxConfirmationStatus::NotFound)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transaction_info(
    tx_id: &TxId,
    tx: &RpcTransaction,
) -> Result<TransactionInfo, GatewayError> {
    let keys = &tx.transaction.message.account_keys;
    let (pre, post) = (&tx.meta.pre_balances, &tx.meta.post_balances);
    if keys.len() < 2 || pre.len() < 2 || post.len() < 2 {
        return Err(GatewayError::TransactionNotAPayment(tx_id.clone()));
    }

    // The recipient account must have gained lamports.
    let received = post[1].checked_sub(pre[1]).ok_or_else(|| {
        GatewayError::TransactionNotAPayment(tx_id.clone())
    })?;
    if received == 0 {
        return Err(GatewayError::TransactionNotAPayment(tx_id.clone()));
    }

    Ok(TransactionInfo {
        quantity: Winc::from(received),
        sender_address: UserAddress::new(keys[0].clone()),
        recipient_address: UserAddress::new(keys[1].clone()),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn tx(pre: Vec<u64>, post: Vec<u64>) -> RpcTransaction {
        RpcTransaction {
            slot: 250_000_000,
            meta: RpcMeta {
                pre_balances: pre,
                post_balances: post,
            },
            transaction: RpcTransactionBody {
                message: RpcMessage {
                    account_keys: vec![
                        "SenderPubkey".to_owned(),
                        "SinkPubkey".to_owned(),
                    ],
                },
            },
        }
    }

    #[test]
    fn quantity_is_recipient_balance_delta() {
        let info = transaction_info(
            &TxId::new("SIG"),
            &tx(vec![10_000_000, 5_000], vec![8_994_000, 1_005_000]),
        )
        .unwrap();
        assert_eq!(info.quantity, Winc::from(1_000_000u64));
        assert_eq!(info.sender_address.as_str(), "SenderPubkey");
        assert_eq!(info.recipient_address.as_str(), "SinkPubkey");
    }

    #[test]
    fn non_payments_are_rejected() {
        // Recipient balance unchanged.
        let err = transaction_info(
            &TxId::new("SIG"),
            &tx(vec![10_000_000, 5_000], vec![9_995_000, 5_000]),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::TransactionNotAPayment(_)));

        // Recipient balance decreased.
        let err = transaction_info(
            &TxId::new("SIG"),
            &tx(vec![10_000_000, 5_000], vec![10_000_000, 1_000]),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::TransactionNotAPayment(_)));
    }
}
