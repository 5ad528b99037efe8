//! Transport-only client primitives for the forge generation backend.
//!
//! This crate owns URL building, SSE framing, step-event decoding and the
//! reconnecting event stream for the `/forge/stream` and `/forge/fix`
//! endpoints. It holds no transcript or wallet state.
//!
//! Every message the backend pushes is a JSON object `{title, output}`. The
//! reserved titles `Debug`, `Session` and `Error` are decoded into dedicated
//! [`StepEvent`] variants at the stream boundary so callers match on a closed
//! set of variants instead of comparing strings.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod url;

pub use client::{EventStream, ForgeApiClient, StreamHandle, StreamOpener};
pub use config::ForgeApiConfig;
pub use error::ForgeApiError;
pub use events::{StepEvent, StreamSignal};
pub use payload::{FixRequest, StreamRequest};
pub use retry::RetryPolicy;
pub use sse::SseStreamParser;
pub use url::{fix_url, stream_url};
