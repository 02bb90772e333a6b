//! Decoded message bus.
//!
//! Every subscription takes its own receiver on the transport's raw frame
//! stream at the moment it subscribes, so it observes exactly the frames
//! the transport delivers from then on. Frames are decoded into a typed
//! [`Message`] on receipt; undecodable frames are logged and skipped, so no
//! consumer ever inspects raw JSON.

use crate::ports::transport::SdkTransport;
use ausweis_domain::Message;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

/// Source of decoded SDK message subscriptions.
pub struct MessageBus {
    transport: Arc<dyn SdkTransport>,
    subscribers: Arc<AtomicUsize>,
}

impl MessageBus {
    pub fn new(transport: Arc<dyn SdkTransport>) -> Self {
        Self {
            transport,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A receiver observing every message the transport delivers after
    /// this call.
    pub fn subscribe(&self) -> MessageReceiver {
        self.subscribers.fetch_add(1, Ordering::SeqCst);
        MessageReceiver {
            frames: self.transport.messages(),
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

/// One subscription on the bus. Released on drop.
pub struct MessageReceiver {
    frames: broadcast::Receiver<String>,
    subscribers: Arc<AtomicUsize>,
}

impl MessageReceiver {
    /// The next decodable message.
    ///
    /// Cancel safe: a frame is either returned or was never taken off the
    /// transport stream.
    pub async fn recv(&mut self) -> Result<Message, RecvError> {
        loop {
            let raw = self.frames.recv().await?;
            trace!("SDK frame: {}", raw);
            match Message::decode(&raw) {
                Ok(message) => return Ok(message),
                Err(e) => warn!("Dropping undecodable SDK frame: {}", e),
            }
        }
    }
}

impl Drop for MessageReceiver {
    fn drop(&mut self) {
        self.subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}
