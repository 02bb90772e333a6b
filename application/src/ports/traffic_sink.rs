//! Port for SDK traffic diagnostics.
//!
//! Defines the [`TrafficSink`] trait that receives every transmitted command
//! and every received message while traffic logging is enabled.
//!
//! This is separate from the operational `tracing` output: tracing reports
//! what the engine does, a traffic sink records what crossed the wire.

use ausweis_domain::{Command, Message};
use serde_json::Value;
use tracing::info;

/// One frame that crossed the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TrafficEvent {
    /// An outbound command, secrets already redacted.
    Command(Command),
    /// An inbound, decoded message.
    Message(Message),
}

impl TrafficEvent {
    /// Direction label used by sinks ("command" / "message").
    pub fn direction(&self) -> &'static str {
        match self {
            TrafficEvent::Command(_) => "command",
            TrafficEvent::Message(_) => "message",
        }
    }

    /// The frame as JSON.
    pub fn to_json(&self) -> Value {
        let value = match self {
            TrafficEvent::Command(command) => serde_json::to_value(command),
            TrafficEvent::Message(message) => serde_json::to_value(message),
        };
        value.unwrap_or(Value::Null)
    }
}

/// Port for recording SDK traffic.
///
/// `record` is synchronous and non-fallible: a failing sink must never
/// disturb the command flow, so implementations swallow their own errors.
pub trait TrafficSink: Send + Sync {
    fn record(&self, event: &TrafficEvent);
}

/// Default sink: pretty-printed frames on the `ausweis::traffic` tracing
/// target.
pub struct TracingTrafficSink;

impl TrafficSink for TracingTrafficSink {
    fn record(&self, event: &TrafficEvent) {
        let pretty = serde_json::to_string_pretty(&event.to_json()).unwrap_or_default();
        match event {
            TrafficEvent::Command(_) => {
                info!(target: "ausweis::traffic", "SDK command:\n{}", pretty)
            }
            TrafficEvent::Message(_) => {
                info!(target: "ausweis::traffic", "SDK message:\n{}", pretty)
            }
        }
    }
}

/// No-op implementation for tests and when traffic logging is unwanted.
pub struct NoTrafficSink;

impl TrafficSink for NoTrafficSink {
    fn record(&self, _event: &TrafficEvent) {}
}
