//! Application layer for ausweis-bridge
//!
//! This crate contains the command correlation engine, the session lifecycle,
//! the workflow helper and the port definitions the infrastructure adapts.
//! It depends only on the domain layer.

pub mod bus;
pub mod command_service;
pub mod config;
pub mod correlation;
pub mod error;
pub mod ports;
pub mod session;
pub mod traffic;
pub mod workflow_helper;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use bus::{MessageBus, MessageReceiver};
pub use command_service::{AuthOptions, ChangePinOptions, CommandService};
pub use config::{CallOptions, DEFAULT_TIMEOUT, ServiceConfig};
pub use correlation::{Correlator, PendingCall};
pub use error::{CommandError, InitializeError, SessionError};
pub use ports::{
    traffic_sink::{NoTrafficSink, TracingTrafficSink, TrafficEvent, TrafficSink},
    transport::{SdkTransport, TransportError},
};
pub use session::{SessionController, SessionState};
pub use traffic::TrafficLog;
pub use workflow_helper::{
    DEFAULT_READER, InitializeOptions, SIMULATOR_READER, Subscription, WorkflowHelper,
};
