//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for SDK replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// The reply payload as JSON
    Json,
}

/// CLI arguments for ausweis
#[derive(Parser, Debug)]
#[command(name = "ausweis")]
#[command(author, version, about = "Drive the AusweisApp SDK from the command line")]
#[command(long_about = r#"
ausweis talks to a running AusweisApp SDK over its local WebSocket endpoint
and runs eID workflows against it.

Configuration files are loaded from (in priority order):
1. AUSWEIS_* environment variables (e.g. AUSWEIS_SDK__URL)
2. --config <path>     Explicit config file
3. ./ausweis.toml      Project-level config
4. ~/.config/ausweis/config.toml   Global config

Example:
  ausweis info
  ausweis readers
  ausweis --simulator auth "https://test.governikus-eid.de/AusweisAuskunft/WebServiceRequesterServlet" --pin 123456
  ausweis change-pin --pin 123456 --new-pin 654321
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<SdkCommand>,

    /// SDK WebSocket URL (overrides configuration)
    #[arg(long, value_name = "URL", global = true)]
    pub url: Option<String>,

    /// Use the SDK's simulated reader and card
    #[arg(long, global = true)]
    pub simulator: bool,

    /// Log every command and message exchanged with the SDK
    #[arg(long, global = true)]
    pub traffic: bool,

    /// Command timeout in milliseconds (overrides configuration)
    #[arg(long, value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

/// Operations against the SDK
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SdkCommand {
    /// Show SDK version information
    Info,

    /// Show the state of the running workflow
    Status,

    /// Show (or set) the API level
    ApiLevel {
        /// Switch to this level
        #[arg(long, value_name = "LEVEL")]
        set: Option<u32>,
    },

    /// List the connected card readers
    Readers,

    /// Run an authentication against a provider
    Auth {
        /// TC token URL of the service provider
        #[arg(value_name = "TC_TOKEN_URL")]
        tc_token_url: String,

        /// PIN of the card
        #[arg(long)]
        pin: String,

        /// CAN of the card, needed after two wrong PIN attempts
        #[arg(long)]
        can: Option<String>,

        /// Allow test services with invalid certificates
        #[arg(long)]
        developer_mode: bool,
    },

    /// Change the PIN of the card
    ChangePin {
        /// Current PIN
        #[arg(long)]
        pin: String,

        /// New six-digit PIN
        #[arg(long)]
        new_pin: String,

        /// CAN of the card, needed after two wrong PIN attempts
        #[arg(long)]
        can: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_auth() {
        let cli = Cli::parse_from([
            "ausweis",
            "-vv",
            "--simulator",
            "auth",
            "https://example.org/tcToken",
            "--pin",
            "123456",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.simulator);
        assert_eq!(
            cli.command,
            Some(SdkCommand::Auth {
                tc_token_url: "https://example.org/tcToken".into(),
                pin: "123456".into(),
                can: None,
                developer_mode: false,
            })
        );
    }

    #[test]
    fn test_parse_api_level_and_globals_after_subcommand() {
        let cli = Cli::parse_from(["ausweis", "api-level", "--set", "2", "-o", "json"]);
        assert_eq!(cli.command, Some(SdkCommand::ApiLevel { set: Some(2) }));
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_change_pin_requires_new_pin() {
        let result = Cli::try_parse_from(["ausweis", "change-pin", "--pin", "123456"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_show_config_without_subcommand() {
        let cli = Cli::parse_from(["ausweis", "--show-config"]);
        assert!(cli.show_config);
        assert!(cli.command.is_none());
    }
}
