use std::time::Duration;

use forge_api::{ForgeApiConfig, RetryPolicy};

use crate::error::SessionError;

pub const BASE_URL_ENV_VAR: &str = "FORGE_BASE_URL";
pub const RPC_URL_ENV_VAR: &str = "FORGE_RPC_URL";
pub const FROM_ADDRESS_ENV_VAR: &str = "FORGE_FROM_ADDRESS";
pub const MAX_RETRIES_ENV_VAR: &str = "FORGE_MAX_RETRIES";
pub const RETRY_BASE_MS_ENV_VAR: &str = "FORGE_RETRY_BASE_MS";
pub const PLAN_TITLES_ENV_VAR: &str = "FORGE_PLAN_TITLES";

/// Node endpoint the backend simulates against when none is configured.
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Step titles whose output may carry a transaction plan.
pub const DEFAULT_PLAN_TITLES: [&str; 2] = ["Simulating Transactions", "Execute"];

/// Everything a [`crate::SessionController`] needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub api: ForgeApiConfig,
    /// Connected wallet address used as `from` for every submission.
    pub from_address: String,
    /// Target network RPC endpoint forwarded to the backend.
    pub rpc_url: String,
    pub plan_titles: Vec<String>,
}

impl SessionConfig {
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            api: ForgeApiConfig::default(),
            from_address: from_address.into(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            plan_titles: DEFAULT_PLAN_TITLES.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn with_api(mut self, api: ForgeApiConfig) -> Self {
        self.api = api;
        self
    }

    #[must_use]
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    #[must_use]
    pub fn with_plan_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan_titles = titles.into_iter().map(Into::into).collect();
        self
    }

    /// Builds a config from the `FORGE_*` environment variables.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    ///
    /// Blank values count as unset. `FORGE_FROM_ADDRESS` is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let from_address = read(FROM_ADDRESS_ENV_VAR).ok_or(SessionError::InvalidConfig {
            key: FROM_ADDRESS_ENV_VAR,
            reason: "must be set".to_string(),
        })?;
        validate_address(&from_address)?;

        let mut config = Self::new(from_address);

        if let Some(base_url) = read(BASE_URL_ENV_VAR) {
            config.api = config.api.with_base_url(base_url);
        }
        if let Some(rpc_url) = read(RPC_URL_ENV_VAR) {
            config.rpc_url = rpc_url;
        }

        let mut retry = RetryPolicy::default();
        if let Some(raw) = read(MAX_RETRIES_ENV_VAR) {
            retry = retry.with_max_retries(parse_number(MAX_RETRIES_ENV_VAR, &raw)?);
        }
        if let Some(raw) = read(RETRY_BASE_MS_ENV_VAR) {
            let millis: u64 = parse_number(RETRY_BASE_MS_ENV_VAR, &raw)?;
            retry = retry.with_base_delay(Duration::from_millis(millis));
        }
        config.api = config.api.with_retry(retry);

        if let Some(raw) = read(PLAN_TITLES_ENV_VAR) {
            let titles: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .map(ToString::to_string)
                .collect();
            if !titles.is_empty() {
                config.plan_titles = titles;
            }
        }

        Ok(config)
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, SessionError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|error| SessionError::InvalidConfig {
        key,
        reason: format!("'{raw}': {error}"),
    })
}

/// Checks that `address` is a `0x`-prefixed 20-byte hex address.
///
/// Checksum casing is not verified; the address is forwarded as given.
pub fn validate_address(address: &str) -> Result<(), SessionError> {
    let invalid = |reason| SessionError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let Some(hex) = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    else {
        return Err(invalid("missing 0x prefix"));
    };
    if hex.len() != 40 {
        return Err(invalid("expected 40 hex digits"));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("contains non-hex characters"));
    }
    Ok(())
}
