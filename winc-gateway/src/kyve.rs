//! Kyve (Cosmos SDK) gateway adapter, speaking to the chain's REST API.
//!
//! Only plain bank transfers count as payments: the transaction must carry a
//! single `MsgSend` denominated in `ukyve` (or `tkyve` on testnets). A
//! transaction included with a non-zero code was rejected by the chain and
//! will never credit.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use winc_common::{address::UserAddress, ids::TxId};

use crate::{
    error::GatewayError, parse_quantity, Gateway, TransactionInfo,
    TxConfirmationStatus,
};

const ACCEPTED_DENOMS: [&str; 2] = ["ukyve", "tkyve"];
const MSG_SEND_TYPE: &str = "/cosmos.bank.v1beta1.MsgSend";

pub struct KyveGateway {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TxQueryResponse {
    tx_response: TxResponse,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    code: u32,
    height: String,
    tx: Tx,
}

#[derive(Debug, Deserialize)]
struct Tx {
    body: TxBody,
}

#[derive(Debug, Deserialize)]
struct TxBody {
    messages: Vec<TxMessage>,
}

#[derive(Debug, Deserialize)]
struct TxMessage {
    #[serde(rename = "@type")]
    type_url: String,
    from_address: Option<String>,
    to_address: Option<String>,
    #[serde(default)]
    amount: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct Coin {
    denom: String,
    amount: String,
}

impl KyveGateway {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    async fn query_tx(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<TxResponse>, GatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/cosmos/tx/v1beta1/txs/{}",
                self.endpoint, tx_id,
            ))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()?
            .json::<TxQueryResponse>()
            .await?;
        Ok(Some(response.tx_response))
    }
}

#[async_trait]
impl Gateway for KyveGateway {
    async fn get_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<TransactionInfo>, GatewayError> {
        let Some(tx_response) = self.query_tx(tx_id).await? else {
            return Ok(None);
        };
        payment_info(tx_id, &tx_response).map(Some)
    }

    async fn get_transaction_status(
        &self,
        tx_id: &TxId,
    ) -> Result<TxConfirmationStatus, GatewayError> {
        let Some(tx_response) = self.query_tx(tx_id).await? else {
            return Ok(TxConfirmationStatus::NotFound);
        };
        if tx_response.code != 0 {
            return Err(GatewayError::TransactionNotMined(tx_id.clone()));
        }
        // Cosmos blocks are final once included.
        let block_height =
            tx_response.height.parse::<u64>().map_err(|_| {
                GatewayError::BadResponse(format!(
                    "bad block height: {:?}",
                    tx_response.height,
                ))
            })?;
        Ok(TxConfirmationStatus::Confirmed { block_height })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn payment_info(
    tx_id: &TxId,
    tx_response: &TxResponse,
) -> Result<TransactionInfo, GatewayError> {
    if tx_response.code != 0 {
        return Err(GatewayError::TransactionNotMined(tx_id.clone()));
    }

    let [message] = tx_response.tx.body.messages.as_slice() else {
        return Err(GatewayError::TransactionNotAPayment(tx_id.clone()));
    };
    if message.type_url != MSG_SEND_TYPE {
        return Err(GatewayError::TransactionNotAPayment(tx_id.clone()));
    }
    let (Some(from), Some(to)) =
        (message.from_address.as_ref(), message.to_address.as_ref())
    else {
        return Err(GatewayError::TransactionNotAPayment(tx_id.clone()));
    };
    let [coin] = message.amount.as_slice() else {
        return Err(GatewayError::TransactionNotAPayment(tx_id.clone()));
    };
    if !ACCEPTED_DENOMS.contains(&coin.denom.as_str()) {
        return Err(GatewayError::TransactionNotAPayment(tx_id.clone()));
    }

    Ok(TransactionInfo {
        quantity: parse_quantity(&coin.amount)?,
        sender_address: UserAddress::new(from.clone()),
        recipient_address: UserAddress::new(to.clone()),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn msg_send_response(code: u32, denom: &str) -> TxResponse {
        TxResponse {
            code,
            height: "123456".to_owned(),
            tx: Tx {
                body: TxBody {
                    messages: vec![TxMessage {
                        type_url: MSG_SEND_TYPE.to_owned(),
                        from_address: Some("kyve1sender".to_owned()),
                        to_address: Some("kyve1sink".to_owned()),
                        amount: vec![Coin {
                            denom: denom.to_owned(),
                            amount: "5000000".to_owned(),
                        }],
                    }],
                },
            },
        }
    }

    #[test]
    fn accepts_ukyve_msg_send() {
        let info =
            payment_info(&TxId::new("K"), &msg_send_response(0, "ukyve"))
                .unwrap();
        assert_eq!(info.quantity.to_string(), "5000000");
        assert_eq!(info.recipient_address.as_str(), "kyve1sink");
    }

    #[test]
    fn rejects_wrong_denoms() {
        let err =
            payment_info(&TxId::new("K"), &msg_send_response(0, "uatom"))
                .unwrap_err();
        assert!(matches!(err, GatewayError::TransactionNotAPayment(_)));
    }

    #[test]
    fn non_zero_code_is_not_mined() {
        let err =
            payment_info(&TxId::new("K"), &msg_send_response(5, "ukyve"))
                .unwrap_err();
        assert!(matches!(err, GatewayError::TransactionNotMined(_)));
    }

    #[test]
    fn non_transfer_messages_are_rejected() {
        let mut response = msg_send_response(0, "ukyve");
        response.tx.body.messages[0].type_url =
            "/cosmos.staking.v1beta1.MsgDelegate".to_owned();
        let err = payment_info(&TxId::new("K"), &response).unwrap_err();
        assert!(matches!(err, GatewayError::TransactionNotAPayment(_)));
    }
}
