//! JSON-RPC implementation of the shared `wallet_provider` contract.
//!
//! Every wallet request is forwarded as a JSON-RPC 2.0 call to a node endpoint
//! that holds the sender's keys (an unlocked development node, a signer
//! proxy, or similar). Node-side `error` objects surface as
//! [`WalletError::Rejected`] with the node's message kept verbatim.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;
use wallet_provider::{WalletError, WalletProfile, WalletProvider, WalletRequest};

/// Stable provider identifier used for explicit startup selection.
pub const RPC_WALLET_ID: &str = "json-rpc";

/// Runtime configuration for the JSON-RPC wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonRpcWalletConfig {
    pub endpoint: String,
    pub timeout: Option<Duration>,
}

impl JsonRpcWalletConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// `WalletProvider` that forwards requests to a JSON-RPC node.
#[derive(Debug)]
pub struct JsonRpcWallet {
    http: reqwest::Client,
    endpoint: Url,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    pub fn new(config: JsonRpcWalletConfig) -> Result<Self, WalletError> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|error| {
            WalletError::Transport(format!("invalid endpoint {}: {error}", config.endpoint))
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|error| WalletError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    fn profile(&self) -> WalletProfile {
        WalletProfile {
            provider_id: RPC_WALLET_ID.to_string(),
        }
    }

    async fn request(&self, request: WalletRequest) -> Result<Value, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(id, method = %request.method, "wallet rpc request");

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": request.method,
            "params": request.params,
        });

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|error| WalletError::Transport(error.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| WalletError::Transport(error.to_string()))?;

        let envelope = match serde_json::from_str::<RpcResponse>(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(WalletError::Transport(format!("HTTP {status} {}", text.trim())));
            }
            Err(error) => return Err(WalletError::InvalidResponse(error.to_string())),
        };

        if let Some(error) = envelope.error {
            return Err(WalletError::Rejected {
                code: Some(error.code),
                message: error.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| WalletError::InvalidResponse("response carries no result".to_string()))
    }
}
