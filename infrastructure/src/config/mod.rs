//! Configuration file loading for ausweis-bridge
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `AUSWEIS_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./ausweis.toml` or `./.ausweis.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/ausweis/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, DEFAULT_SDK_URL, FileConfig, FileReaderConfig, FileSdkConfig,
    FileTimeoutsConfig, FileTrafficConfig,
};
pub use loader::ConfigLoader;
