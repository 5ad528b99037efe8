//! Streaming-session controller for intent-driven on-chain execution.
//!
//! A [`SessionController`] submits a natural-language intent to the forge
//! backend, folds the streamed step events into an append-only
//! [`Transcript`], and executes any transaction plan the backend proposes one
//! transaction at a time through a [`wallet_provider::WalletProvider`].
//!
//! ## Configuration
//!
//! [`SessionConfig::from_env`] reads:
//!
//! - `FORGE_FROM_ADDRESS` (required): connected sender address
//! - `FORGE_BASE_URL`: backend base URL, default `http://127.0.0.1:3000`
//! - `FORGE_RPC_URL`: target network RPC, default `http://localhost:8545`
//! - `FORGE_MAX_RETRIES`: reconnect cap; unset means retry forever
//! - `FORGE_RETRY_BASE_MS`: reconnect delay unit, default `1000`
//! - `FORGE_PLAN_TITLES`: comma separated step titles that may carry a plan
//!
//! Logging goes through `tracing`; [`telemetry::init_tracing`] installs a
//! subscriber filtered by `FORGE_LOG`.

pub mod config;
pub mod error;
pub mod plan;
pub mod queue;
pub mod session;
pub mod telemetry;
pub mod transcript;

pub use config::SessionConfig;
pub use error::SessionError;
pub use plan::{PlanAssembler, ProposedTransaction};
pub use queue::TransactionQueue;
pub use session::{Phase, SessionController, SessionUpdate, StreamKind};
pub use transcript::{fold, FoldOutcome, Role, Transcript, TranscriptEntry};
