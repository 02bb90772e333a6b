//! Infrastructure layer for ausweis-bridge
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod transport;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, DEFAULT_SDK_URL, FileConfig, FileReaderConfig,
    FileSdkConfig, FileTimeoutsConfig, FileTrafficConfig,
};
pub use logging::JsonlTrafficSink;
pub use transport::WebSocketTransport;
