//! Logging infrastructure for SDK traffic.
//!
//! Provides [`JsonlTrafficSink`], a JSONL file writer that implements
//! the [`TrafficSink`](ausweis_application::TrafficSink) port.

mod jsonl_traffic;

pub use jsonl_traffic::JsonlTrafficSink;
