use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de, Deserialize, Deserializer};
use std::time::Duration;
use tokio::time::Instant;

use super::base::{BlockInfo, ChainClient, Confirmation, Signer, Submission, UnsignedTransaction};
use crate::config::ChatConfig;
use crate::errors::{ChatError, ChatResult};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// ChainClient over a fullnode-style JSON REST API.
///
/// Submission goes through the node gateway's signing endpoint, authorized
/// by the signer's credential; confirmation polls the transaction-by-hash
/// endpoint until it leaves the pending state.
pub struct RestChainClient {
    http: Client,
    base_url: String,
    poll_interval: Duration,
}

// Numeric fields ride as decimal strings in the node API.
fn u64_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    hash: String,
    #[serde(deserialize_with = "u64_from_str")]
    gas_unit_price: u64,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    #[serde(rename = "type")]
    kind: String,
    success: Option<bool>,
    gas_used: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
    #[serde(deserialize_with = "u64_from_str")]
    block_height: u64,
}

impl RestChainClient {
    pub fn new(base_url: impl Into<String>) -> ChatResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(RestChainClient {
            http,
            base_url: base_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Build the client against the session configuration's node gateway.
    pub fn from_config(config: &ChatConfig) -> ChatResult<Self> {
        Self::new(&config.node_url)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: de::DeserializeOwned>(&self, path: &str) -> ChatResult<Option<T>> {
        let response = self.http.get(self.url(path)).send().await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ChatError::Status { status, body })
            }
        }
    }
}

#[async_trait]
impl ChainClient for RestChainClient {
    async fn sign_and_submit(
        &self,
        signer: &Signer,
        txn: &UnsignedTransaction,
    ) -> ChatResult<Submission> {
        let body = serde_json::json!({
            "sender": signer.address(),
            "payload": txn.payload,
        });

        let response = self
            .http
            .post(self.url("/v1/transactions"))
            .header(
                "Authorization",
                format!("Bearer {}", signer.credential()),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }

        let submitted: SubmitResponse = response.json().await?;
        tracing::debug!(hash = %submitted.hash, "transaction submitted");
        Ok(Submission {
            hash: submitted.hash,
            gas_unit_price: submitted.gas_unit_price,
        })
    }

    async fn wait_for_inclusion(&self, hash: &str, timeout: Duration) -> ChatResult<Confirmation> {
        let deadline = Instant::now() + timeout;
        let path = format!("/v1/transactions/by_hash/{hash}");

        loop {
            // 404 means the node has not seen the transaction yet.
            if let Some(txn) = self.get_json::<TransactionResponse>(&path).await? {
                if txn.kind != "pending_transaction" {
                    let missing =
                        || ChatError::Protocol(format!("incomplete transaction for {hash}"));
                    let gas_used = txn
                        .gas_used
                        .as_deref()
                        .and_then(|v| v.parse().ok())
                        .ok_or_else(missing)?;
                    let version = txn
                        .version
                        .as_deref()
                        .and_then(|v| v.parse().ok())
                        .ok_or_else(missing)?;
                    return Ok(Confirmation {
                        success: txn.success.ok_or_else(missing)?,
                        gas_used,
                        version,
                    });
                }
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(ChatError::ConfirmationTimeout(timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_block_by_version(&self, version: u64) -> ChatResult<BlockInfo> {
        let path = format!("/v1/blocks/by_version/{version}");
        let block: BlockResponse = self
            .get_json(&path)
            .await?
            .ok_or_else(|| ChatError::Protocol(format!("no block for version {version}")))?;
        Ok(BlockInfo {
            block_height: block.block_height,
        })
    }
}
