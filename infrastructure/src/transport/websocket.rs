//! WebSocket transport to the SDK kernel endpoint.
//!
//! A single connection task owns the socket. Outbound frames reach it over an
//! unbounded `mpsc` channel so [`transmit`](SdkTransport::transmit) stays
//! synchronous; inbound text frames, lifecycle pulses and failures leave it
//! over broadcast channels, matching the multicast contract of the port.

use ausweis_application::{SdkTransport, TransportError};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::DEFAULT_SDK_URL;

const FRAME_CAPACITY: usize = 256;
const SIGNAL_CAPACITY: usize = 16;

/// Handle of the live connection task.
struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    shutdown: CancellationToken,
}

/// Broadcast ends shared with the connection task.
#[derive(Clone)]
struct Signals {
    messages: broadcast::Sender<String>,
    connected: broadcast::Sender<()>,
    disconnected: broadcast::Sender<()>,
    errors: broadcast::Sender<String>,
    running: Arc<AtomicBool>,
}

pub struct WebSocketTransport {
    url: String,
    signals: Signals,
    connection: Mutex<Option<Connection>>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            signals: Signals {
                messages: broadcast::channel(FRAME_CAPACITY).0,
                connected: broadcast::channel(SIGNAL_CAPACITY).0,
                disconnected: broadcast::channel(SIGNAL_CAPACITY).0,
                errors: broadcast::channel(SIGNAL_CAPACITY).0,
                running: Arc::new(AtomicBool::new(false)),
            },
            connection: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn run(
        url: String,
        mut outbound: mpsc::UnboundedReceiver<String>,
        shutdown: CancellationToken,
        signals: Signals,
    ) {
        let connect = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            connect = tokio_tungstenite::connect_async(url.as_str()) => connect,
        };

        let socket = match connect {
            Ok((socket, _response)) => socket,
            Err(e) => {
                warn!("Could not connect to SDK at {}: {}", url, e);
                let _ = signals.errors.send(format!("connect to {} failed: {}", url, e));
                return;
            }
        };

        signals.running.store(true, Ordering::SeqCst);
        info!("Connected to SDK at {}", url);
        let _ = signals.connected.send(());

        let (mut sink, mut stream) = socket.split();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    let _ = sink.send(Frame::Close(None)).await;
                    break;
                }
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    trace!("-> {}", frame);
                    if let Err(e) = sink.send(Frame::Text(frame.into())).await {
                        let _ = signals.errors.send(format!("send failed: {}", e));
                        break;
                    }
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(Frame::Text(text))) => {
                        trace!("<- {}", text.as_str());
                        let _ = signals.messages.send(text.as_str().to_owned());
                    }
                    Some(Ok(Frame::Close(_))) | None => {
                        debug!("SDK closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = signals.errors.send(format!("receive failed: {}", e));
                        break;
                    }
                },
            }
        }

        signals.running.store(false, Ordering::SeqCst);
        info!("Disconnected from SDK");
        let _ = signals.disconnected.send(());
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_SDK_URL)
    }
}

#[async_trait]
impl SdkTransport for WebSocketTransport {
    fn start(&self) -> Result<(), TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let (outbound, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let previous = self
            .connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(Connection {
                outbound,
                shutdown: shutdown.clone(),
            });
        if let Some(previous) = previous {
            previous.shutdown.cancel();
        }

        debug!("Connecting to SDK at {}", self.url);
        runtime.spawn(Self::run(
            self.url.clone(),
            receiver,
            shutdown,
            self.signals.clone(),
        ));
        Ok(())
    }

    fn stop(&self) -> Result<(), TransportError> {
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(TransportError::NotRunning)?;
        connection.shutdown.cancel();
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.signals.running.load(Ordering::SeqCst)
    }

    fn transmit(&self, frame: String) -> Result<(), TransportError> {
        if !self.signals.running.load(Ordering::SeqCst) {
            return Err(TransportError::NotRunning);
        }
        let connection = self.connection.lock().unwrap_or_else(|e| e.into_inner());
        let connection = connection.as_ref().ok_or(TransportError::NotRunning)?;
        connection
            .outbound
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    fn messages(&self) -> broadcast::Receiver<String> {
        self.signals.messages.subscribe()
    }

    fn connected(&self) -> broadcast::Receiver<()> {
        self.signals.connected.subscribe()
    }

    fn disconnected(&self) -> broadcast::Receiver<()> {
        self.signals.disconnected.subscribe()
    }

    fn errors(&self) -> broadcast::Receiver<String> {
        self.signals.errors.subscribe()
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(connection) = self
            .connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            connection.shutdown.cancel();
        }
    }
}
