//! Deterministic mock implementation of the shared `wallet_provider` contract.
//!
//! This crate contains no signing or transport logic and is intended for local
//! development and contract-level integration testing. Every request is
//! recorded, and the peak number of concurrently pending requests is tracked so
//! callers can assert that submissions never overlap.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use wallet_provider::{WalletError, WalletProfile, WalletProvider, WalletRequest};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_WALLET_ID: &str = "mock";

/// Scripted result for one wallet request.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    /// Resolve with this transaction hash.
    Hash(String),
    /// Resolve with an arbitrary JSON value.
    Value(Value),
    /// Reject with this message.
    Reject(String),
}

/// Deterministic mock wallet used by session tests and local runs.
#[derive(Debug, Default)]
pub struct MockWallet {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    requests: Mutex<Vec<WalletRequest>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_hash: AtomicU64,
}

impl MockWallet {
    /// Creates a wallet that resolves every request with a sequential hash.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a wallet that plays back `outcomes` in order, then falls back
    /// to sequential hashes.
    #[must_use]
    pub fn with_outcomes(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    /// Delays every response by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Appends an outcome to the script.
    pub fn push_outcome(&self, outcome: MockOutcome) {
        lock_unpoisoned(&self.outcomes).push_back(outcome);
    }

    /// Requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<WalletRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }

    /// Highest number of requests that were pending at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> MockOutcome {
        lock_unpoisoned(&self.outcomes).pop_front().unwrap_or_else(|| {
            let n = self.next_hash.fetch_add(1, Ordering::SeqCst) + 1;
            MockOutcome::Hash(format!("0x{n:064x}"))
        })
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn profile(&self) -> WalletProfile {
        WalletProfile {
            provider_id: MOCK_WALLET_ID.to_string(),
        }
    }

    async fn request(&self, request: WalletRequest) -> Result<Value, WalletError> {
        lock_unpoisoned(&self.requests).push(request);
        let pending = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(pending, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let outcome = self.next_outcome();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            MockOutcome::Hash(hash) => Ok(Value::String(hash)),
            MockOutcome::Value(value) => Ok(value),
            MockOutcome::Reject(message) => Err(WalletError::rejected(message)),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
