//! Minimal provider-agnostic contract for a connected wallet.
//!
//! A wallet exposes a single capability, `request({method, params})`, in the
//! shape of an EIP-1193 provider. This crate also defines the typed
//! transaction-submission call layered on top of it. It excludes transport
//! details and any signing implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// JSON-RPC method used to submit a transaction for signing.
pub const METHOD_SEND_TRANSACTION: &str = "eth_sendTransaction";

/// Error returned by a wallet request.
///
/// `Display` for [`WalletError::Rejected`] is the wallet's message verbatim so
/// it can be shown to the user unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("{message}")]
    Rejected { code: Option<i64>, message: String },

    #[error("wallet transport error: {0}")]
    Transport(String),

    #[error("invalid wallet response: {0}")]
    InvalidResponse(String),
}

impl WalletError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            code: None,
            message: message.into(),
        }
    }
}

/// One `request({method, params})` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRequest {
    pub method: String,
    pub params: Value,
}

impl WalletRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Transaction fields handed to the wallet for signing and submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    pub value: String,
}

impl TransactionRequest {
    pub fn into_wallet_request(self) -> WalletRequest {
        WalletRequest::new(METHOD_SEND_TRANSACTION, json!([self]))
    }
}

/// Identifier of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHandle {
    pub hash: String,
}

impl TransactionHandle {
    /// Accepts a bare hash string or an object exposing `hash`.
    pub fn from_response(value: &Value) -> Result<Self, WalletError> {
        let hash = match value {
            Value::String(hash) => Some(hash.as_str()),
            Value::Object(fields) => fields
                .get("hash")
                .or_else(|| fields.get("transactionHash"))
                .and_then(Value::as_str),
            _ => None,
        };

        match hash.map(str::trim).filter(|hash| !hash.is_empty()) {
            Some(hash) => Ok(Self {
                hash: hash.to_string(),
            }),
            None => Err(WalletError::InvalidResponse(format!(
                "expected a transaction hash, got {value}"
            ))),
        }
    }
}

/// Immutable metadata describing a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletProfile {
    pub provider_id: String,
}

/// Wallet capability consumed by the transaction queue.
#[async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Returns provider identity metadata.
    fn profile(&self) -> WalletProfile;

    /// Forwards one raw request to the wallet.
    async fn request(&self, request: WalletRequest) -> Result<Value, WalletError>;

    /// Submits a transaction and resolves with its identifier.
    async fn send_transaction(
        &self,
        transaction: TransactionRequest,
    ) -> Result<TransactionHandle, WalletError> {
        let response = self.request(transaction.into_wallet_request()).await?;
        TransactionHandle::from_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{
        TransactionHandle, TransactionRequest, WalletError, WalletProfile, WalletProvider,
        WalletRequest, METHOD_SEND_TRANSACTION,
    };

    struct EchoWallet {
        response: Value,
        seen: Mutex<Vec<WalletRequest>>,
    }

    #[async_trait]
    impl WalletProvider for EchoWallet {
        fn profile(&self) -> WalletProfile {
            WalletProfile {
                provider_id: "echo".to_string(),
            }
        }

        async fn request(&self, request: WalletRequest) -> Result<Value, WalletError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request);
            }
            Ok(self.response.clone())
        }
    }

    fn transaction() -> TransactionRequest {
        TransactionRequest {
            from: "0xfrom".to_string(),
            to: "0xto".to_string(),
            data: "0xdeadbeef".to_string(),
            value: "0x0".to_string(),
        }
    }

    #[tokio::test]
    async fn send_transaction_issues_eth_send_transaction() {
        let wallet = EchoWallet {
            response: json!("0xabc"),
            seen: Mutex::new(Vec::new()),
        };

        let handle = wallet
            .send_transaction(transaction())
            .await
            .expect("echo wallet resolves");
        assert_eq!(handle.hash, "0xabc");

        let seen = wallet.seen.lock().expect("lock").clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, METHOD_SEND_TRANSACTION);
        assert_eq!(
            seen[0].params,
            json!([{"from": "0xfrom", "to": "0xto", "data": "0xdeadbeef", "value": "0x0"}])
        );
    }

    #[test]
    fn handle_accepts_string_and_object_responses() {
        assert_eq!(
            TransactionHandle::from_response(&json!("0x1")).expect("string hash"),
            TransactionHandle {
                hash: "0x1".to_string()
            }
        );
        assert_eq!(
            TransactionHandle::from_response(&json!({"hash": "0x2"}))
                .expect("object hash")
                .hash,
            "0x2"
        );
    }

    #[test]
    fn handle_rejects_responses_without_hash() {
        let error = TransactionHandle::from_response(&json!({"status": 1}))
            .expect_err("missing hash must fail");
        assert!(matches!(error, WalletError::InvalidResponse(_)));
        assert!(TransactionHandle::from_response(&json!("  ")).is_err());
    }

    #[test]
    fn rejected_error_displays_message_verbatim() {
        let error = WalletError::rejected("User rejected the request.");
        assert_eq!(error.to_string(), "User rejected the request.");
    }
}
