use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::config::ForgeApiConfig;
use crate::error::ForgeApiError;
use crate::events::StreamSignal;
use crate::headers::build_headers;
use crate::payload::{FixRequest, StreamRequest};
use crate::retry::RetryPolicy;
use crate::sse::SseStreamParser;

/// Cancellation flag shared between a stream handle and its pump task.
pub type CancellationSignal = Arc<AtomicBool>;

/// Opens event streams for a fully-built endpoint URL.
///
/// The session controller only depends on this seam, so in-process sources can
/// stand in for the HTTP backend.
pub trait StreamOpener: Send + Sync {
    fn open(&self, url: Url) -> EventStream;
}

#[derive(Debug, Clone)]
pub struct ForgeApiClient {
    http: Client,
    headers: HeaderMap,
    config: ForgeApiConfig,
}

impl ForgeApiClient {
    pub fn new(config: ForgeApiConfig) -> Result<Self, ForgeApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build()?;
        let headers = header_map(&config)?;
        // Fail at construction rather than on first open.
        crate::url::endpoint_url(&config.base_url, crate::url::STREAM_PATH)?;

        Ok(Self {
            http,
            headers,
            config,
        })
    }

    pub fn config(&self) -> &ForgeApiConfig {
        &self.config
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn stream_url(&self, request: &StreamRequest) -> Result<Url, ForgeApiError> {
        crate::url::stream_url(&self.config.base_url, request)
    }

    pub fn fix_url(&self, request: &FixRequest) -> Result<Url, ForgeApiError> {
        crate::url::fix_url(&self.config.base_url, request)
    }

    /// Opens a reconnecting event stream against `url`.
    ///
    /// Must be called from within a tokio runtime. Every reconnect reuses `url`
    /// verbatim.
    pub fn open_stream(&self, url: Url) -> EventStream {
        let (sink, events) = mpsc::unbounded_channel();
        let cancel: CancellationSignal = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_stream(
            self.http.clone(),
            self.headers.clone(),
            url.clone(),
            self.config.retry,
            sink,
            Arc::clone(&cancel),
        ));

        EventStream {
            url,
            handle: StreamHandle {
                cancel,
                task: Some(task),
            },
            events,
        }
    }
}

impl StreamOpener for ForgeApiClient {
    fn open(&self, url: Url) -> EventStream {
        self.open_stream(url)
    }
}

/// Owned handle to a running stream task.
///
/// Closing is idempotent and also cancels a pending reconnect timer. Dropping
/// the handle closes it.
#[derive(Debug)]
pub struct StreamHandle {
    cancel: CancellationSignal,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Handle for a stream fed by something other than a spawned pump task.
    pub fn detached() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn close(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// One open stream: its URL, its handle, and the signals it delivers.
#[derive(Debug)]
pub struct EventStream {
    url: Url,
    handle: StreamHandle,
    events: UnboundedReceiver<StreamSignal>,
}

impl EventStream {
    pub fn from_parts(url: Url, handle: StreamHandle, events: UnboundedReceiver<StreamSignal>) -> Self {
        Self {
            url,
            handle,
            events,
        }
    }

    /// A stream whose signals are pushed by the caller through the returned sender.
    pub fn detached(url: Url) -> (UnboundedSender<StreamSignal>, Self) {
        let (sink, events) = mpsc::unbounded_channel();
        (sink, Self::from_parts(url, StreamHandle::detached(), events))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Waits for the next signal. Returns `None` once closed or drained.
    pub async fn next(&mut self) -> Option<StreamSignal> {
        if self.handle.is_closed() {
            return None;
        }
        self.events.recv().await
    }

    pub fn close(&mut self) {
        self.handle.close();
        self.events.close();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

enum PumpEnd {
    Completed,
    Detached,
}

async fn run_stream(
    http: Client,
    headers: HeaderMap,
    url: Url,
    retry: RetryPolicy,
    sink: UnboundedSender<StreamSignal>,
    cancel: CancellationSignal,
) {
    let mut attempt = 0u32;

    loop {
        if is_cancelled(&cancel) {
            return;
        }

        let error = match pump_once(&http, &headers, &url, &sink, &cancel).await {
            Ok(PumpEnd::Completed) => {
                debug!(url = %url.path(), "event stream completed");
                deliver(&sink, &cancel, StreamSignal::Completed);
                return;
            }
            Ok(PumpEnd::Detached) => return,
            Err(error) => error,
        };

        attempt += 1;
        if !retry.allows(attempt) {
            let attempts = attempt - 1;
            warn!(attempts, %error, "event stream retries exhausted");
            deliver(
                &sink,
                &cancel,
                StreamSignal::Failed(ForgeApiError::RetryExhausted {
                    attempts,
                    last_error: error.to_string(),
                }),
            );
            return;
        }

        let delay = retry.delay_for(attempt);
        warn!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            %error,
            "event stream transport error, reconnecting"
        );
        let notified = deliver(
            &sink,
            &cancel,
            StreamSignal::Retrying {
                attempt,
                delay,
                error: error.to_string(),
            },
        );
        if !notified {
            return;
        }

        tokio::time::sleep(delay).await;
    }
}

async fn pump_once(
    http: &Client,
    headers: &HeaderMap,
    url: &Url,
    sink: &UnboundedSender<StreamSignal>,
    cancel: &CancellationSignal,
) -> Result<PumpEnd, ForgeApiError> {
    let response = http
        .get(url.clone())
        .headers(headers.clone())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ForgeApiError::status(status, &body));
    }

    let mut bytes = response.bytes_stream();
    let mut parser = SseStreamParser::default();

    while let Some(chunk) = bytes.next().await {
        let chunk = chunk?;
        for event in parser.feed(&chunk) {
            if !deliver(sink, cancel, StreamSignal::Event(event)) {
                return Ok(PumpEnd::Detached);
            }
        }
    }

    Ok(PumpEnd::Completed)
}

fn deliver(
    sink: &UnboundedSender<StreamSignal>,
    cancel: &CancellationSignal,
    signal: StreamSignal,
) -> bool {
    if is_cancelled(cancel) {
        return false;
    }
    sink.send(signal).is_ok()
}

fn is_cancelled(cancel: &CancellationSignal) -> bool {
    cancel.load(Ordering::Acquire)
}

fn header_map(config: &ForgeApiConfig) -> Result<HeaderMap, ForgeApiError> {
    let mut out = HeaderMap::new();
    for (key, value) in build_headers(config) {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
            ForgeApiError::InvalidHeader {
                name: key.clone(),
                reason: error.to_string(),
            }
        })?;
        let value = HeaderValue::from_str(&value).map_err(|error| {
            ForgeApiError::InvalidHeader {
                name: key.clone(),
                reason: error.to_string(),
            }
        })?;
        out.insert(name, value);
    }
    Ok(out)
}
