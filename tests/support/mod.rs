#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use forge_api::{EventStream, StepEvent, StreamOpener, StreamSignal};
use intent_forge::{SessionConfig, SessionController};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;
use wallet_provider_mock::MockWallet;

pub const FROM_ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

/// Opener that hands out in-process streams and keeps their senders.
#[derive(Default)]
pub struct ScriptedOpener {
    opened: Mutex<Vec<(Url, UnboundedSender<StreamSignal>)>>,
}

impl ScriptedOpener {
    pub fn urls(&self) -> Vec<Url> {
        lock_unpoisoned(&self.opened)
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn open_count(&self) -> usize {
        lock_unpoisoned(&self.opened).len()
    }

    pub fn sender(&self, index: usize) -> UnboundedSender<StreamSignal> {
        let opened = lock_unpoisoned(&self.opened);
        let Some((_, sender)) = opened.get(index) else {
            panic!("stream {index} was never opened");
        };
        sender.clone()
    }

    /// Queues step events on stream `index`, followed by `Completed`.
    pub fn play(&self, index: usize, events: Vec<StepEvent>) {
        self.push(index, events);
        self.sender(index)
            .send(StreamSignal::Completed)
            .expect("stream receiver alive");
    }

    /// Queues step events on stream `index` without ending it.
    pub fn push(&self, index: usize, events: Vec<StepEvent>) {
        let sender = self.sender(index);
        for event in events {
            sender
                .send(StreamSignal::Event(event))
                .expect("stream receiver alive");
        }
    }
}

impl StreamOpener for ScriptedOpener {
    fn open(&self, url: Url) -> EventStream {
        let (sender, stream) = EventStream::detached(url.clone());
        lock_unpoisoned(&self.opened).push((url, sender));
        stream
    }
}

pub fn controller(opener: &Arc<ScriptedOpener>, wallet: &Arc<MockWallet>) -> SessionController {
    let opener: Arc<dyn StreamOpener> = opener.clone();
    SessionController::new(SessionConfig::new(FROM_ADDRESS), opener, wallet.clone())
        .expect("valid session config")
}

pub fn tx_json(function: &str, to: &str) -> Value {
    json!({
        "to": to,
        "function": function,
        "arguments": ["0x00000000000000000000000000000000000000aa", "1"],
        "value": "0",
        "input_data": format!("0x{function}"),
    })
}

/// A plan payload as the backend streams it.
pub fn plan(functions: &[&str]) -> String {
    let items: Vec<Value> = functions
        .iter()
        .enumerate()
        .map(|(i, function)| tx_json(function, &format!("0x{:040x}", i + 1)))
        .collect();
    Value::Array(items).to_string()
}

pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
