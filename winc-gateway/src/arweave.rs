//! Arweave gateway adapter.
//!
//! Status comes from the `/tx/{id}/status` route; transaction details come
//! from the gateway's GraphQL endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use winc_common::{address::UserAddress, ids::TxId};

use crate::{
    error::GatewayError, parse_quantity, Gateway, TransactionInfo,
    TxConfirmationStatus,
};

pub const DEFAULT_ENDPOINT: &str = "https://arweave.net";
pub const DEFAULT_MIN_CONFIRMATIONS: u32 = 18;

pub struct ArweaveGateway {
    client: reqwest::Client,
    endpoint: String,
    min_confirmations: u32,
}

#[derive(Debug, Deserialize)]
struct TxStatusResponse {
    block_height: u64,
    number_of_confirmations: u32,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: GraphqlData,
}

#[derive(Debug, Deserialize)]
struct GraphqlData {
    transaction: Option<GraphqlTransaction>,
}

#[derive(Debug, Deserialize)]
struct GraphqlTransaction {
    recipient: String,
    owner: GraphqlOwner,
    quantity: GraphqlQuantity,
}

#[derive(Debug, Deserialize)]
struct GraphqlOwner {
    address: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlQuantity {
    winston: String,
}

impl ArweaveGateway {
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
}

#[async_trait]
impl Gateway for ArweaveGateway {
    async fn get_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<TransactionInfo>, GatewayError> {
        let query = json!({
            "query": "query($id: ID!) { transaction(id: $id) { \
                      recipient owner { address } quantity { winston } } }",
            "variables": { "id": tx_id.as_str() },
        });
        let response = self
            .client
            .post(format!("{}/graphql", self.endpoint))
            .json(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<GraphqlResponse>()
            .await?;

        let Some(tx) = response.data.transaction else {
            return Ok(None);
        };
        Ok(Some(TransactionInfo {
            quantity: parse_quantity(&tx.quantity.winston)?,
            sender_address: UserAddress::new(tx.owner.address),
            recipient_address: UserAddress::new(tx.recipient),
        }))
    }

    async fn get_transaction_status(
        &self,
        tx_id: &TxId,
    ) -> Result<TxConfirmationStatus, GatewayError> {
        let response = self
            .client
            .get(format!("{}/tx/{}/status", self.endpoint, tx_id))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(TxConfirmationStatus::NotFound),
            // The gateway answers 202 while the transaction sits in the
            // mempool.
            StatusCode::ACCEPTED => Ok(TxConfirmationStatus::Pending),
            status if status.is_success() => {
                let status = response.json::<TxStatusResponse>().await?;
                Ok(confirmation_status(&status, self.min_confirmations))
            }
            status => Err(GatewayError::BadResponse(format!(
                "unexpected status route response: {status}",
            ))),
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn confirmation_status(
    status: &TxStatusResponse,
    min_confirmations: u32,
) -> TxConfirmationStatus {
    if status.number_of_confirmations >= min_confirmations {
        TxConfirmationStatus::Confirmed {
            block_height: status.block_height,
        }
    } else {
        TxConfirmationStatus::Pending
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn confirmation_threshold() {
        let status = TxStatusResponse {
            block_height: 1_500_000,
            number_of_confirmations: 17,
        };
        assert_eq!(
            confirmation_status(&status, DEFAULT_MIN_CONFIRMATIONS),
            TxConfirmationStatus::Pending,
        );

        let status = TxStatusResponse {
            block_height: 1_500_000,
            number_of_confirmations: 18,
        };
        assert_eq!(
            confirmation_status(&status, DEFAULT_MIN_CONFIRMATIONS),
            TxConfirmationStatus::Confirmed {
                block_height: 1_500_000,
            },
        );
    }

    #[test]
    fn graphql_response_parses() {
        let raw = r#"{
            "data": {
                "transaction": {
                    "recipient": "SINK",
                    "owner": { "address": "SENDER" },
                    "quantity": { "winston": "1000000000000" }
                }
            }
        }"#;
        let response = serde_json::from_str::<GraphqlResponse>(raw).unwrap();
        let tx = response.data.transaction.unwrap();
        assert_eq!(tx.recipient, "SINK");
        assert_eq!(tx.owner.address, "SENDER");
        assert_eq!(tx.quantity.winston, "1000000000000");
    }
}
