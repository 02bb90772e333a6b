//! SDK transport port
//!
//! Defines the boundary to the process or service hosting the SDK. The
//! channel is untagged: replies never carry a request id, so correlation is
//! left to [`Correlator`](crate::correlation::Correlator).

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors raised by a transport, either while handing it an instruction or
/// as an out-of-band signal on [`SdkTransport::errors`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Out-of-band failure reported by the native side.
    #[error("SDK error: {0}")]
    Sdk(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport not running")]
    NotRunning,

    #[error("Transport closed")]
    Closed,
}

/// Transport to the SDK.
///
/// All streams are multicast: every call to [`messages`](Self::messages),
/// [`connected`](Self::connected), [`disconnected`](Self::disconnected) or
/// [`errors`](Self::errors) hands out a fresh receiver that observes events
/// sent after it was created. Implementations live in the infrastructure
/// layer.
#[async_trait]
pub trait SdkTransport: Send + Sync {
    /// Ask the transport to come up. Completion is signalled by a pulse on
    /// [`connected`](Self::connected).
    fn start(&self) -> Result<(), TransportError>;

    /// Ask the transport to go down. Completion is signalled by a pulse on
    /// [`disconnected`](Self::disconnected).
    fn stop(&self) -> Result<(), TransportError>;

    async fn is_running(&self) -> bool;

    /// Hand one serialized command to the SDK. Fire-and-forget.
    fn transmit(&self, frame: String) -> Result<(), TransportError>;

    /// Raw inbound frames, one serialized message each.
    fn messages(&self) -> broadcast::Receiver<String>;

    fn connected(&self) -> broadcast::Receiver<()>;

    fn disconnected(&self) -> broadcast::Receiver<()>;

    /// Out-of-band transport failures.
    fn errors(&self) -> broadcast::Receiver<String>;
}
