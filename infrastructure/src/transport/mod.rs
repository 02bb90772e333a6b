//! Transport adapters for the SDK.

mod websocket;

pub use websocket::WebSocketTransport;
