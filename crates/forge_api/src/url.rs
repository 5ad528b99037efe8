use url::Url;

use crate::error::ForgeApiError;
use crate::payload::{FixRequest, StreamRequest};

/// Default base URL of a locally running backend.
pub const DEFAULT_FORGE_BASE_URL: &str = "http://127.0.0.1:3000";

pub const STREAM_PATH: &str = "forge/stream";
pub const FIX_PATH: &str = "forge/fix";

/// Resolve an endpoint path against a base URL.
///
/// Normalization rules:
/// 1) blank base falls back to [`DEFAULT_FORGE_BASE_URL`]
/// 2) a base already ending in `/forge/stream` or `/forge/fix` is cut back to its prefix
/// 3) existing query and fragment are discarded
pub fn endpoint_url(base: &str, path: &str) -> Result<Url, ForgeApiError> {
    let base = if base.trim().is_empty() {
        DEFAULT_FORGE_BASE_URL
    } else {
        base.trim()
    };

    let mut url = Url::parse(base).map_err(|error| {
        ForgeApiError::InvalidBaseUrl(format!("{base}: {error}"))
    })?;
    if url.cannot_be_a_base() {
        return Err(ForgeApiError::InvalidBaseUrl(base.to_string()));
    }

    let prefix = url.path().trim_end_matches('/').to_string();
    let prefix = prefix
        .strip_suffix(&format!("/{STREAM_PATH}"))
        .or_else(|| prefix.strip_suffix(&format!("/{FIX_PATH}")))
        .unwrap_or(&prefix)
        .to_string();

    url.set_path(&format!("{prefix}/{path}"));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Full `/forge/stream` URL with query parameters fixed at open time.
pub fn stream_url(base: &str, request: &StreamRequest) -> Result<Url, ForgeApiError> {
    let mut url = endpoint_url(base, STREAM_PATH)?;
    url.query_pairs_mut().extend_pairs(request.query_pairs());
    Ok(url)
}

/// Full `/forge/fix` URL with query parameters fixed at open time.
pub fn fix_url(base: &str, request: &FixRequest) -> Result<Url, ForgeApiError> {
    let mut url = endpoint_url(base, FIX_PATH)?;
    url.query_pairs_mut().extend_pairs(request.query_pairs());
    Ok(url)
}
