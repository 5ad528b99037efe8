use forge_api::ForgeApiError;
use thiserror::Error;

/// Errors returned by session controller operations.
///
/// These only cover requests the controller refuses outright. Failures that
/// happen while a stream or a wallet submission is running are recorded in
/// the transcript instead.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("intent must not be empty")]
    EmptyIntent,

    #[error("invalid sender address '{address}': {reason}")]
    InvalidAddress { address: String, reason: &'static str },

    #[error("invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error(transparent)]
    Api(#[from] ForgeApiError),
}
