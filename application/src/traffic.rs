//! Traffic logging toggle.
//!
//! While enabled, one routing task forwards every outbound command and every
//! decoded inbound message to the configured [`TrafficSink`]. Enabling twice
//! keeps the running task, disabling tears it down; at most one task exists.

use crate::bus::{MessageBus, MessageReceiver};
use crate::ports::traffic_sink::{TrafficEvent, TrafficSink, TracingTrafficSink};
use ausweis_domain::Command;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMMAND_CAPACITY: usize = 64;

struct ActiveRoute {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct TrafficLog {
    commands: broadcast::Sender<Command>,
    sink: Mutex<Arc<dyn TrafficSink>>,
    active: Mutex<Option<ActiveRoute>>,
}

impl TrafficLog {
    pub fn new() -> Self {
        let (commands, _) = broadcast::channel(COMMAND_CAPACITY);
        Self {
            commands,
            sink: Mutex::new(Arc::new(TracingTrafficSink)),
            active: Mutex::new(None),
        }
    }

    /// Replace the sink. Takes effect on the next [`enable`](Self::enable).
    pub fn set_sink(&self, sink: Arc<dyn TrafficSink>) {
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = sink;
    }

    pub fn is_enabled(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|route| !route.handle.is_finished())
    }

    /// Toggle traffic logging.
    pub fn set_enabled(&self, enabled: bool, bus: &MessageBus) {
        if enabled {
            self.enable(bus);
        } else {
            self.disable();
        }
    }

    /// Start routing traffic to the sink. No-op when already enabled.
    pub fn enable(&self, bus: &MessageBus) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.as_ref().is_some_and(|route| !route.handle.is_finished()) {
            debug!("Traffic logging already enabled");
            return;
        }

        let sink = Arc::clone(&*self.sink.lock().unwrap_or_else(|e| e.into_inner()));
        let token = CancellationToken::new();
        let handle = tokio::spawn(Self::route(
            bus.subscribe(),
            self.commands.subscribe(),
            sink,
            token.clone(),
        ));
        *active = Some(ActiveRoute { token, handle });
        debug!("Traffic logging enabled");
    }

    /// Stop routing traffic. No-op when already disabled.
    pub fn disable(&self) {
        let route = self.active.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(route) = route {
            route.token.cancel();
            debug!("Traffic logging disabled");
        }
    }

    /// Publish an outbound command. Secrets are redacted here, before any
    /// sink can observe them.
    pub fn publish_command(&self, command: &Command) {
        if self.commands.receiver_count() > 0 {
            let _ = self.commands.send(command.redacted());
        }
    }

    async fn route(
        mut messages: MessageReceiver,
        mut commands: broadcast::Receiver<Command>,
        sink: Arc<dyn TrafficSink>,
        token: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                command = commands.recv() => match command {
                    Ok(command) => TrafficEvent::Command(command),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Traffic log skipped {} commands", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                message = messages.recv() => match message {
                    Ok(message) => TrafficEvent::Message(message),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Traffic log skipped {} messages", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };
            sink.record(&event);
        }
    }
}

impl Default for TrafficLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrafficLog {
    fn drop(&mut self) {
        self.disable();
    }
}
