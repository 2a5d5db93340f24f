//! ARIO (AO process) gateway adapter.
//!
//! ARIO transfers are AO messages, so there is no chain to watch; instead
//! the message's evaluation result is read from a compute-unit endpoint. A
//! transfer is settled once its result contains a `Credit-Notice` message
//! carrying `Sender` and `Quantity` tags. AO results have no block height,
//! so confirmed transfers report height 0.

use async_trait::async_trait;
use serde::Deserialize;
use winc_common::{address::UserAddress, ids::TxId};

use crate::{
    error::GatewayError, parse_quantity, Gateway, TransactionInfo,
    TxConfirmationStatus,
};

const CREDIT_NOTICE_ACTION: &str = "Credit-Notice";

pub struct ArioGateway {
    client: reqwest::Client,
    /// Compute-unit endpoint evaluating the token process.
    cu_url: String,
    /// The ARIO token process whose messages we read.
    process_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MessageResult {
    #[serde(default)]
    messages: Vec<AoMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AoMessage {
    #[serde(default)]
    target: String,
    #[serde(default)]
    tags: Vec<AoTag>,
}

#[derive(Debug, Deserialize)]
struct AoTag {
    name: String,
    value: String,
}

impl ArioGateway {
    pub fn new(
        client: reqwest::Client,
        cu_url: String,
        process_id: String,
    ) -> Self {
        Self {
            client,
            cu_url,
            process_id,
        }
    }

    async fn message_result(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<MessageResult>, GatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/result/{}?process-id={}",
                self.cu_url, tx_id, self.process_id,
            ))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let result = response
            .error_for_status()?
            .json::<MessageResult>()
            .await?;
        Ok(Some(result))
    }
}

#[async_trait]
impl Gateway for ArioGateway {
    async fn get_transaction(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<TransactionInfo>, GatewayError> {
        let Some(result) = self.message_result(tx_id).await? else {
            return Ok(None);
        };
        match credit_notice_info(&result) {
            Some(info) => Ok(Some(info)),
            // Evaluated, but no credit notice: the message was not a
            // transfer (or the transfer failed inside the process).
            None => Err(GatewayError::TransactionNotAPayment(tx_id.clone())),
        }
    }

    async fn get_transaction_status(
        &self,
        tx_id: &TxId,
    ) -> Result<TxConfirmationStatus, GatewayError> {
        match self.message_result(tx_id).await? {
            None => Ok(TxConfirmationStatus::NotFound),
            Some(result) => match credit_notice_info(&result) {
                Some(_) => {
                    Ok(TxConfirmationStatus::Confirmed { block_height: 0 })
                }
                None => Ok(TxConfirmationStatus::Pending),
            },
        }
    }

    fn endpoint(&self) -> &str {
        &self.cu_url
    }
}

/// Scans an evaluation result for a `Credit-Notice` message and pulls the
/// transfer details out of its tags.
fn credit_notice_info(result: &MessageResult) -> Option<TransactionInfo> {
    for message in &result.messages {
        let tag = |name: &str| {
            message
                .tags
                .iter()
                .find(|tag| tag.name == name)
                .map(|tag| tag.value.as_str())
        };
        if tag("Action") != Some(CREDIT_NOTICE_ACTION) {
            continue;
        }
        let (Some(sender), Some(quantity)) = (tag("Sender"), tag("Quantity"))
        else {
            continue;
        };
        let Ok(quantity) = parse_quantity(quantity) else {
            continue;
        };
        return Some(TransactionInfo {
            quantity,
            sender_address: UserAddress::new(sender),
            recipient_address: UserAddress::new(message.target.clone()),
        });
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    fn tag(name: &str, value: &str) -> AoTag {
        AoTag {
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }

    #[test]
    fn finds_credit_notice() {
        let result = MessageResult {
            messages: vec![
                AoMessage {
                    target: "SENDER".to_owned(),
                    tags: vec![tag("Action", "Debit-Notice")],
                },
                AoMessage {
                    target: "SINK".to_owned(),
                    tags: vec![
                        tag("Action", "Credit-Notice"),
                        tag("Sender", "SENDER"),
                        tag("Quantity", "1000000"),
                    ],
                },
            ],
        };

        let info = credit_notice_info(&result).unwrap();
        assert_eq!(info.quantity.to_string(), "1000000");
        assert_eq!(info.sender_address.as_str(), "SENDER");
        assert_eq!(info.recipient_address.as_str(), "SINK");
    }

    #[test]
    fn no_credit_notice_means_none() {
        let result = MessageResult {
            messages: vec![AoMessage {
                target: "SENDER".to_owned(),
                tags: vec![tag("Action", "Transfer-Error")],
            }],
        };
        assert!(credit_notice_info(&result).is_none());
        assert!(credit_notice_info(&MessageResult { messages: vec![] })
            .is_none());
    }
}
