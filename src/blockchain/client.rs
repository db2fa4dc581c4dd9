// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Network client for the pool's JSON-RPC node.
//!
//! [`ChainClient`] is the seam between the withdrawal pipeline and the
//! network; [`RpcClient`] implements it over `solana-rpc-client`. Node errors
//! are classified here, from the crate's structured error kinds, into
//! [`ClientError`] and [`FailureKind`] so that callers branch on a typed value
//! rather than on error text.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use solana_rpc_client::http_sender::HttpSender;
use solana_rpc_client::nonblocking::rpc_client::RpcClient as NodeClient;
use solana_rpc_client::rpc_client::RpcClientConfig;
use solana_rpc_client_api::client_error::{Error as NodeError, ErrorKind};
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_rpc_client_api::custom_error::JSON_RPC_SERVER_ERROR_SEND_TRANSACTION_PREFLIGHT_FAILURE;
use solana_rpc_client_api::request::{RpcError, RpcRequest, RpcResponseErrorData};
use tracing::debug;
use url::Url;

use super::transactions::SignedTransaction;
use super::types::{
    Commitment, FailureKind, Pubkey, ReferenceHash, Signature, SignatureStatus,
};
use crate::config::RpcConfig;

/// Options for [`ChainClient::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Skip the node's pre-validation (simulation) step.
    pub skip_preflight: bool,
    pub preflight_commitment: Commitment,
}

/// Operations the withdrawal pipeline needs from the network.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Most recent blockhash at `commitment`, with its expiry height.
    async fn latest_reference_hash(
        &self,
        commitment: Commitment,
    ) -> Result<ReferenceHash, ClientError>;

    /// Balance of `address` in lamports.
    async fn balance(&self, address: &Pubkey, commitment: Commitment)
        -> Result<u64, ClientError>;

    /// Broadcast a signed transaction. Success means the node queued it, not
    /// that it was included.
    async fn submit(
        &self,
        transaction: &SignedTransaction,
        options: SubmitOptions,
    ) -> Result<Signature, ClientError>;

    /// Current status of `signature`, or `None` if the node has never seen it.
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, ClientError>;

    async fn block_height(&self, commitment: Commitment) -> Result<u64, ClientError>;

    /// Node liveness.
    async fn health(&self) -> Result<(), ClientError>;

    /// Forward an allowlisted method and return its raw `result`.
    async fn call_raw(&self, method: &'static str, params: Value) -> Result<Value, ClientError>;
}

/// Errors that can occur talking to the node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("invalid RPC client configuration: {0}")]
    Configuration(String),

    /// The request never reached the node, or was refused before processing.
    #[error("network error: {0}")]
    Network(String),

    /// The request may have reached the node but no usable answer was read.
    #[error("no response from node: {0}")]
    Indeterminate(String),

    #[error("node error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        kind: FailureKind,
    },

    #[error("invalid response from node: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Classification of a node-reported failure, if this is one.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ClientError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether a submission that ended with this error may still have
    /// reached the node.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            ClientError::Indeterminate(_) | ClientError::InvalidResponse(_)
        )
    }
}

impl From<NodeError> for ClientError {
    fn from(err: NodeError) -> Self {
        let text = err.to_string();
        match err.kind() {
            ErrorKind::Reqwest(e) if e.is_connect() || e.is_builder() => ClientError::Network(text),
            ErrorKind::Reqwest(e) => match e.status() {
                // Gateways answer 5xx and 408 after forwarding; the node may
                // have the request.
                Some(status) if status.is_server_error() || status.as_u16() == 408 => {
                    ClientError::Indeterminate(text)
                }
                Some(_) => ClientError::Network(text),
                None => ClientError::Indeterminate(text),
            },
            ErrorKind::Io(_) => ClientError::Indeterminate(text),
            ErrorKind::RpcError(RpcError::RpcResponseError {
                code,
                message,
                data,
            }) => {
                let kind = match data {
                    RpcResponseErrorData::SendTransactionPreflightFailure(simulation) => simulation
                        .err
                        .as_ref()
                        .map(FailureKind::classify)
                        .unwrap_or(FailureKind::Other),
                    _ => FailureKind::Other,
                };
                ClientError::Remote {
                    code: *code,
                    message: message.clone(),
                    kind,
                }
            }
            ErrorKind::TransactionError(err) => ClientError::Remote {
                code: JSON_RPC_SERVER_ERROR_SEND_TRANSACTION_PREFLIGHT_FAILURE,
                message: err.to_string(),
                kind: FailureKind::classify(err),
            },
            ErrorKind::SigningError(_) => ClientError::Configuration(text),
            _ => ClientError::InvalidResponse(text),
        }
    }
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// JSON-RPC client over HTTP(S).
pub struct RpcClient {
    node: NodeClient,
    url: Url,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let name = HeaderName::try_from(config.api_key_header.as_str())
                .map_err(|e| ClientError::Configuration(format!("API key header: {e}")))?;
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| ClientError::Configuration(format!("API key value: {e}")))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        let sender = HttpSender::new_with_client(config.url.as_str(), http);
        // Every call passes its commitment explicitly; this is only the fallback.
        let node = NodeClient::new_sender(
            sender,
            RpcClientConfig::with_commitment(Commitment::Confirmed.config()),
        );

        Ok(Self {
            node,
            url: config.url.clone(),
        })
    }

    /// The node endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn latest_reference_hash(
        &self,
        commitment: Commitment,
    ) -> Result<ReferenceHash, ClientError> {
        let (blockhash, last_valid_block_height) = self
            .node
            .get_latest_blockhash_with_commitment(commitment.config())
            .await?;
        Ok(ReferenceHash {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn balance(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<u64, ClientError> {
        let balance = self
            .node
            .get_balance_with_commitment(address, commitment.config())
            .await?;
        Ok(balance.value)
    }

    async fn submit(
        &self,
        transaction: &SignedTransaction,
        options: SubmitOptions,
    ) -> Result<Signature, ClientError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(options.preflight_commitment.level()),
            ..RpcSendTransactionConfig::default()
        };
        let signature = self
            .node
            .send_transaction_with_config(transaction.transaction(), config)
            .await?;
        debug!(%signature, "Transaction accepted by node");
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, ClientError> {
        let statuses = self
            .node
            .get_signature_statuses_with_history(&[*signature])
            .await?;

        Ok(statuses.value.into_iter().next().flatten().map(|status| {
            let confirmation_status = [
                Commitment::Finalized,
                Commitment::Confirmed,
                Commitment::Processed,
            ]
            .into_iter()
            .find(|level| status.satisfies_commitment(level.config()));
            SignatureStatus {
                slot: status.slot,
                err: status.err,
                confirmation_status,
            }
        }))
    }

    async fn block_height(&self, commitment: Commitment) -> Result<u64, ClientError> {
        Ok(self
            .node
            .get_block_height_with_commitment(commitment.config())
            .await?)
    }

    async fn health(&self) -> Result<(), ClientError> {
        Ok(self.node.get_health().await?)
    }

    async fn call_raw(&self, method: &'static str, params: Value) -> Result<Value, ClientError> {
        debug!(method, "Forwarding RPC call");
        Ok(self.node.send(RpcRequest::Custom { method }, params).await?)
    }
}
