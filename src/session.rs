use std::sync::Arc;
use std::time::Duration;

use forge_api::{
    EventStream, FixRequest, ForgeApiClient, StepEvent, StreamOpener, StreamRequest,
    StreamSignal,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wallet_provider::{TransactionHandle, TransactionRequest, WalletError, WalletProvider};

use crate::config::{validate_address, SessionConfig};
use crate::error::SessionError;
use crate::plan::{PlanAssembler, ProposedTransaction};
use crate::queue::{PlanId, Resolution, Submission, TransactionQueue};
use crate::transcript::{fold, FoldOutcome, Transcript};

pub const CONNECTION_ERROR_TITLE: &str = "Connection Error";
pub const TRANSACTION_SENT_TITLE: &str = "Transaction Sent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Generate,
    Fix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Streaming(StreamKind),
    Completed,
    Failed,
}

/// What one call to [`SessionController::next_update`] applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A step event was folded; `plan` is the size of a plan it completed.
    Folded {
        outcome: FoldOutcome,
        plan: Option<usize>,
    },
    Reconnecting {
        attempt: u32,
        delay: Duration,
    },
    StreamCompleted,
    /// Retries ran out; a `Connection Error` entry was appended.
    ConnectionLost {
        message: String,
    },
    TransactionSubmitted {
        label: String,
    },
    TransactionSent {
        function_name: String,
        hash: String,
    },
    TransactionFailed {
        function_name: String,
        message: String,
    },
}

#[derive(Debug)]
struct WalletOutcome {
    plan_id: PlanId,
    function_name: String,
    result: Result<TransactionHandle, WalletError>,
}

/// Drives one user-facing request: its event streams, transcript, and
/// transaction queue.
///
/// Every mutation goes through `&mut self`, so stream signals and wallet
/// resolutions are applied one at a time in the order `next_update` observes
/// them.
pub struct SessionController {
    config: SessionConfig,
    opener: Arc<dyn StreamOpener>,
    wallet: Arc<dyn WalletProvider>,
    transcript: Transcript,
    queue: TransactionQueue,
    plans: PlanAssembler,
    phase: Phase,
    session_token: Option<String>,
    correlation_id: Option<String>,
    stream: Option<EventStream>,
    wallet_tx: UnboundedSender<WalletOutcome>,
    wallet_rx: UnboundedReceiver<WalletOutcome>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .field("session_token", &self.session_token)
            .field("entries", &self.transcript.len())
            .field("queued", &self.queue.len())
            .field("wallet", &self.wallet.profile().provider_id)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        opener: Arc<dyn StreamOpener>,
        wallet: Arc<dyn WalletProvider>,
    ) -> Result<Self, SessionError> {
        validate_address(&config.from_address)?;
        forge_api::url::endpoint_url(&config.api.base_url, forge_api::url::STREAM_PATH)?;

        let (wallet_tx, wallet_rx) = mpsc::unbounded_channel();
        let plans = PlanAssembler::new(config.plan_titles.clone());

        Ok(Self {
            config,
            opener,
            wallet,
            transcript: Transcript::new(),
            queue: TransactionQueue::new(),
            plans,
            phase: Phase::Idle,
            session_token: None,
            correlation_id: None,
            stream: None,
            wallet_tx,
            wallet_rx,
        })
    }

    /// Controller backed by the HTTP forge client built from `config.api`.
    pub fn connect(
        config: SessionConfig,
        wallet: Arc<dyn WalletProvider>,
    ) -> Result<Self, SessionError> {
        let client = ForgeApiClient::new(config.api.clone())?;
        Self::new(config, Arc::new(client), wallet)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn queue(&self) -> &TransactionQueue {
        &self.queue
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Starts a generation stream for `intent`, closing any previous stream.
    pub fn submit_intent(&mut self, intent: &str) -> Result<(), SessionError> {
        let intent = intent.trim();
        if intent.is_empty() {
            return Err(SessionError::EmptyIntent);
        }

        let correlation_id = Uuid::new_v4().to_string();
        let request = StreamRequest::new(intent, &self.config.from_address, &self.config.rpc_url)
            .with_session_id(&correlation_id);
        let url = forge_api::stream_url(&self.config.api.base_url, &request)?;

        self.close_stream();
        self.plans.reset();
        self.session_token = None;
        self.transcript.push_user(intent);

        info!(session_id = %correlation_id, "opening generation stream");
        self.correlation_id = Some(correlation_id);
        self.stream = Some(self.opener.open(url));
        self.phase = Phase::Streaming(StreamKind::Generate);
        Ok(())
    }

    /// Opens a fix stream for the failed last entry.
    ///
    /// Returns `false` without side effects unless the last entry is failed,
    /// no stream is active, and a session token has been captured.
    pub fn request_fix(&mut self, error_text: &str) -> bool {
        if !self.transcript.last_is_failed() || self.stream.is_some() {
            debug!("fix request ignored");
            return false;
        }
        let Some(token) = self.session_token.clone() else {
            debug!("fix request ignored without a session token");
            return false;
        };

        let request = FixRequest::new(error_text, &self.config.rpc_url, token);
        let url = match forge_api::fix_url(&self.config.api.base_url, &request) {
            Ok(url) => url,
            Err(error) => {
                warn!(%error, "failed to build fix url");
                return false;
            }
        };

        self.plans.reset();
        info!(
            session_id = self.correlation_id.as_deref().unwrap_or_default(),
            "opening fix stream"
        );
        self.stream = Some(self.opener.open(url));
        self.phase = Phase::Streaming(StreamKind::Fix);
        true
    }

    /// Lets a stalled queue submit its failing head once more.
    pub fn resume_transactions(&mut self) -> bool {
        self.queue.resume()
    }

    /// Closes the active stream. In-flight wallet calls still resolve.
    pub fn close(&mut self) {
        self.close_stream();
        if matches!(self.phase, Phase::Streaming(_)) {
            self.phase = Phase::Idle;
        }
    }

    /// Applies the next pending change, or returns `None` when nothing is
    /// left to wait for.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        if let Some(submission) = self.queue.begin_next() {
            return Some(self.submit(submission));
        }

        let streaming = self.stream.is_some();
        let awaiting_wallet = self.queue.is_in_flight();
        if !streaming && !awaiting_wallet {
            return None;
        }

        tokio::select! {
            biased;
            signal = next_signal(&mut self.stream), if streaming => {
                Some(self.apply_signal(signal))
            }
            outcome = self.wallet_rx.recv(), if awaiting_wallet => {
                outcome.map(|outcome| self.apply_wallet_outcome(outcome))
            }
        }
    }

    /// Runs until no stream is open and no submission is pending.
    pub async fn run_until_settled(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.next_update().await {
            updates.push(update);
        }
        updates
    }

    fn apply_signal(&mut self, signal: Option<StreamSignal>) -> SessionUpdate {
        match signal {
            Some(StreamSignal::Event(event)) => self.apply_event(event),
            Some(StreamSignal::Retrying { attempt, delay, .. }) => {
                SessionUpdate::Reconnecting { attempt, delay }
            }
            Some(StreamSignal::Completed) | None => {
                debug!("stream completed");
                // A stalled queue keeps the session failed.
                let phase = if self.queue.is_stalled() {
                    Phase::Failed
                } else {
                    Phase::Completed
                };
                self.finish_stream(phase);
                SessionUpdate::StreamCompleted
            }
            Some(StreamSignal::Failed(error)) => {
                let message = error.to_string();
                warn!(%message, "stream gave up reconnecting");
                self.finish_stream(Phase::Failed);
                self.transcript
                    .push_assistant(CONNECTION_ERROR_TITLE, message.clone());
                SessionUpdate::ConnectionLost { message }
            }
        }
    }

    fn apply_event(&mut self, event: StepEvent) -> SessionUpdate {
        let outcome = fold(&mut self.transcript, &event);
        let mut plan = None;

        match &outcome {
            FoldOutcome::Ignored => {
                debug!(output = event.output(), "backend debug");
            }
            FoldOutcome::SessionToken(token) => {
                if self.session_token.is_none() {
                    info!(token = %token, "session token captured");
                    self.session_token = Some(token.clone());
                }
            }
            FoldOutcome::Failed => {
                info!(title = ?self.transcript.last().map(|entry| &entry.title), "step failed");
                self.finish_stream(Phase::Failed);
            }
            FoldOutcome::Started | FoldOutcome::Appended => {
                if let Some(transactions) = self.plans.observe(&event) {
                    plan = Some(self.replace_plan(transactions));
                }
            }
            FoldOutcome::Duplicate => {}
        }

        SessionUpdate::Folded { outcome, plan }
    }

    fn replace_plan(&mut self, transactions: Vec<ProposedTransaction>) -> usize {
        let count = transactions.len();
        let plan_id = self.queue.replace(transactions);
        info!(plan_id, transactions = count, "transaction plan replaced");
        count
    }

    fn submit(&mut self, submission: Submission) -> SessionUpdate {
        let Submission {
            plan_id,
            label,
            transaction,
        } = submission;

        self.transcript
            .push_assistant(label.clone(), describe_pending(&transaction));

        let request = TransactionRequest {
            from: self.config.from_address.clone(),
            to: transaction.to.clone(),
            data: call_data(&transaction.input_data),
            value: quantity(&transaction.value),
        };
        info!(function = %transaction.function_name, to = %transaction.to, "submitting transaction");

        let wallet = Arc::clone(&self.wallet);
        let sink = self.wallet_tx.clone();
        let function_name = transaction.function_name;
        tokio::spawn(async move {
            let result = wallet.send_transaction(request).await;
            let outcome = WalletOutcome {
                plan_id,
                function_name,
                result,
            };
            if sink.send(outcome).is_err() {
                debug!("controller dropped before wallet outcome arrived");
            }
        });

        SessionUpdate::TransactionSubmitted { label }
    }

    fn apply_wallet_outcome(&mut self, outcome: WalletOutcome) -> SessionUpdate {
        let WalletOutcome {
            plan_id,
            function_name,
            result,
        } = outcome;

        match result {
            Ok(handle) => {
                let resolution = self.queue.resolve(plan_id, true);
                info!(function = %function_name, tx_hash = %handle.hash, ?resolution, "transaction sent");
                self.transcript.push_assistant(
                    TRANSACTION_SENT_TITLE,
                    format!("{function_name}: {}", handle.hash),
                );
                SessionUpdate::TransactionSent {
                    function_name,
                    hash: handle.hash,
                }
            }
            Err(error) => {
                let message = error.to_string();
                let resolution = self.queue.resolve(plan_id, false);
                warn!(function = %function_name, %message, ?resolution, "transaction failed");
                self.transcript.fail_last(&format!("\n{message}"));
                if resolution == Resolution::Stalled && self.stream.is_none() {
                    self.phase = Phase::Failed;
                }
                SessionUpdate::TransactionFailed {
                    function_name,
                    message,
                }
            }
        }
    }

    fn finish_stream(&mut self, phase: Phase) {
        self.close_stream();
        self.plans.reset();
        self.phase = phase;
    }

    fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }
}

async fn next_signal(stream: &mut Option<EventStream>) -> Option<StreamSignal> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

fn describe_pending(transaction: &ProposedTransaction) -> String {
    format!(
        "to: {}\nfunction: {}\narguments: {}\nvalue: {}",
        transaction.to,
        transaction.function_name,
        transaction.argument_list.join(", "),
        transaction.value
    )
}

fn call_data(input_data: &str) -> String {
    let trimmed = input_data.trim();
    if trimmed.is_empty() {
        "0x".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Converts a decimal wei amount to a hex quantity. Hex and unparseable
/// values are forwarded as given.
fn quantity(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "0x0".to_string();
    }
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return trimmed.to_string();
    }
    match trimmed.parse::<u128>() {
        Ok(wei) => format!("{wei:#x}"),
        Err(_) => trimmed.to_string(),
    }
}
