//! Test doubles shared by the application layer's unit tests.

use crate::ports::traffic_sink::{TrafficEvent, TrafficSink};
use crate::ports::transport::{SdkTransport, TransportError};
use async_trait::async_trait;
use ausweis_domain::Command;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Delay between scripted replies, so they arrive like real SDK output.
const REPLY_DELAY: Duration = Duration::from_millis(5);

struct Exchange {
    command: Value,
    replies: Vec<String>,
}

/// Scripted stand-in for the SDK.
///
/// Every transmitted command must match the next scripted exchange; its
/// replies are then emitted asynchronously. Lifecycle instructions answer
/// with a pulse unless [`silence_lifecycle`](Self::silence_lifecycle) was
/// called.
pub(crate) struct ScriptedSdk {
    script: Mutex<VecDeque<Exchange>>,
    transmitted: Mutex<Vec<String>>,
    transmit_failure: Mutex<Option<TransportError>>,
    messages: broadcast::Sender<String>,
    connected: broadcast::Sender<()>,
    disconnected: broadcast::Sender<()>,
    errors: broadcast::Sender<String>,
    running: Arc<AtomicBool>,
    lifecycle_pulses: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
    connected_pulses: Arc<AtomicUsize>,
    disconnected_pulses: Arc<AtomicUsize>,
}

impl ScriptedSdk {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            transmitted: Mutex::new(Vec::new()),
            transmit_failure: Mutex::new(None),
            messages: broadcast::channel(64).0,
            connected: broadcast::channel(8).0,
            disconnected: broadcast::channel(8).0,
            errors: broadcast::channel(8).0,
            running: Arc::new(AtomicBool::new(false)),
            lifecycle_pulses: AtomicBool::new(true),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            connected_pulses: Arc::new(AtomicUsize::new(0)),
            disconnected_pulses: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Script the next command and the raw messages it is answered with.
    pub(crate) fn expect(&self, command: Command, replies: &[&str]) {
        let command = serde_json::to_value(&command).unwrap();
        self.script.lock().unwrap().push_back(Exchange {
            command,
            replies: replies.iter().map(|r| r.to_string()).collect(),
        });
    }

    pub(crate) fn fail_transmit(&self, error: TransportError) {
        *self.transmit_failure.lock().unwrap() = Some(error);
    }

    /// Never answer start/stop with a lifecycle pulse.
    pub(crate) fn silence_lifecycle(&self) {
        self.lifecycle_pulses.store(false, Ordering::SeqCst);
    }

    pub(crate) fn emit(&self, raw: &str) {
        let _ = self.messages.send(raw.to_string());
    }

    pub(crate) fn emit_error(&self, payload: &str) {
        let _ = self.errors.send(payload.to_string());
    }

    pub(crate) fn transmitted(&self) -> Vec<String> {
        self.transmitted.lock().unwrap().clone()
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn connected_pulses(&self) -> usize {
        self.connected_pulses.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnected_pulses(&self) -> usize {
        self.disconnected_pulses.load(Ordering::SeqCst)
    }

    pub(crate) fn assert_script_consumed(&self) {
        let remaining = self.script.lock().unwrap().len();
        assert_eq!(remaining, 0, "{remaining} scripted commands were never sent");
    }

    fn pulse(&self, sender: &broadcast::Sender<()>, counter: &Arc<AtomicUsize>) {
        if !self.lifecycle_pulses.load(Ordering::SeqCst) {
            return;
        }
        let sender = sender.clone();
        let counter = Arc::clone(counter);
        tokio::spawn(async move {
            tokio::time::sleep(REPLY_DELAY).await;
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = sender.send(());
        });
    }
}

#[async_trait]
impl SdkTransport for ScriptedSdk {
    fn start(&self) -> Result<(), TransportError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        self.pulse(&self.connected, &self.connected_pulses);
        Ok(())
    }

    fn stop(&self) -> Result<(), TransportError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.pulse(&self.disconnected, &self.disconnected_pulses);
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn transmit(&self, frame: String) -> Result<(), TransportError> {
        if let Some(error) = self.transmit_failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.transmitted.lock().unwrap().push(frame.clone());

        let exchange = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted command sent: {frame}"));
        let sent: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(sent, exchange.command, "command out of script order");

        let messages = self.messages.clone();
        tokio::spawn(async move {
            for reply in exchange.replies {
                tokio::time::sleep(REPLY_DELAY).await;
                let _ = messages.send(reply);
            }
        });
        Ok(())
    }

    fn messages(&self) -> broadcast::Receiver<String> {
        self.messages.subscribe()
    }

    fn connected(&self) -> broadcast::Receiver<()> {
        self.connected.subscribe()
    }

    fn disconnected(&self) -> broadcast::Receiver<()> {
        self.disconnected.subscribe()
    }

    fn errors(&self) -> broadcast::Receiver<String> {
        self.errors.subscribe()
    }
}

/// Sink remembering every recorded event.
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<TrafficEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<TrafficEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TrafficSink for RecordingSink {
    fn record(&self, event: &TrafficEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
