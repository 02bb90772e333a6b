//! CLI entrypoint for ausweis
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use ausweis_application::{
    AuthOptions, CallOptions, ChangePinOptions, CommandError, CommandService, InitializeOptions,
    SIMULATOR_READER, Subscription, WorkflowHelper,
};
use ausweis_domain::Message;
use ausweis_infrastructure::{ConfigLoader, FileConfig, JsonlTrafficSink, WebSocketTransport};
use ausweis_presentation::{Cli, ConsoleFormatter, OutputFormat, SdkCommand};
use clap::{CommandFactory, Parser};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Secrets answering the SDK's credential prompts.
struct Credentials<'a> {
    pin: &'a str,
    new_pin: Option<&'a str>,
    can: Option<&'a str>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = load_config(&cli)?;
    info!("Using SDK at {}", config.sdk.url);

    // === Dependency Injection ===
    let transport = Arc::new(WebSocketTransport::new(config.sdk.url.clone()));
    let mut service = CommandService::new(transport, config.service_config());
    if let Some(path) = &config.traffic.jsonl_path {
        match JsonlTrafficSink::new(path) {
            Some(sink) => service = service.with_traffic_sink(Arc::new(sink)),
            None => warn!("Traffic goes to the log output instead of {}", path.display()),
        }
    }
    let helper = WorkflowHelper::new(Arc::new(service));

    match config.sdk.api_level {
        Some(api_level) => {
            let options = InitializeOptions {
                logging: config.traffic.enabled,
                ..InitializeOptions::new(api_level)
            };
            helper.initialize(options).await?;
        }
        None => {
            helper.service().log_traffic(config.traffic.enabled);
            helper.service().start(None).await?;
        }
    }

    let outcome = run(command, cli.output, &config, &helper).await;

    if let Err(e) = helper.service().stop(None).await {
        warn!("Could not stop the SDK session: {}", e);
    }

    if let Err(e) = &outcome
        && let Some(error) = e.downcast_ref::<CommandError>()
    {
        eprint!("{}", ConsoleFormatter::format_error(error));
        std::process::exit(1);
    }
    outcome
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    // Command line flags take precedence over every configuration source
    if let Some(url) = &cli.url {
        config.sdk.url = url.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeouts.command_ms = timeout_ms;
    }
    config.reader.simulator |= cli.simulator;
    config.traffic.enabled |= cli.traffic;

    config.validate()?;
    Ok(config)
}

async fn run(
    command: SdkCommand,
    format: OutputFormat,
    config: &FileConfig,
    helper: &WorkflowHelper,
) -> Result<()> {
    let service = helper.service();
    let options = CallOptions::with_timeout(config.command_timeout());

    match command {
        SdkCommand::Info => {
            let info = service.get_info(options).await?;
            emit(format, &info, ConsoleFormatter::format_info);
        }
        SdkCommand::Status => {
            let status = service.get_status(options).await?;
            emit(format, &status, ConsoleFormatter::format_status);
        }
        SdkCommand::ApiLevel { set } => {
            let level = match set {
                Some(level) => service.set_api_level(level, options).await?,
                None => service.get_api_level(options).await?,
            };
            emit(format, &level, ConsoleFormatter::format_api_level);
        }
        SdkCommand::Readers => {
            let readers = service.get_reader_list(options).await?;
            emit(format, &readers, ConsoleFormatter::format_readers);
        }
        SdkCommand::Auth {
            tc_token_url,
            pin,
            can,
            developer_mode,
        } => {
            ensure_reader(config, helper, options).await?;
            let _notifications = workflow_notifications(config, helper);

            let auth = AuthOptions {
                developer_mode: developer_mode.then_some(true),
                ..AuthOptions::default()
            };
            let rights = service.run_auth(&tc_token_url, auth, options).await?;
            if format == OutputFormat::Text {
                let certificate = service.get_certificate(options).await?;
                print!("{}", ConsoleFormatter::format_certificate(&certificate));
                print!("{}", ConsoleFormatter::format_access_rights(&rights));
            }

            let prompt = service.accept(options).await?;
            let credentials = Credentials {
                pin: &pin,
                new_pin: None,
                can: can.as_deref(),
            };
            match answer_prompts(service, prompt.into(), &credentials, options).await? {
                Message::Auth(auth) => emit(format, &auth, ConsoleFormatter::format_auth),
                other => bail!("Authentication ended with unexpected {}", other.kind()),
            }
        }
        SdkCommand::ChangePin { pin, new_pin, can } => {
            ensure_reader(config, helper, options).await?;
            let _notifications = workflow_notifications(config, helper);

            let prompt = service
                .change_pin(ChangePinOptions::default(), options)
                .await?;
            let credentials = Credentials {
                pin: &pin,
                new_pin: Some(&new_pin),
                can: can.as_deref(),
            };
            match answer_prompts(service, prompt.into(), &credentials, options).await? {
                Message::ChangePin(change) => {
                    emit(format, &change, ConsoleFormatter::format_change_pin)
                }
                other => bail!("PIN change ended with unexpected {}", other.kind()),
            }
        }
    }

    Ok(())
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) {
    match format {
        OutputFormat::Text => print!("{}", text(value)),
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(value)),
    }
}

async fn ensure_reader(
    config: &FileConfig,
    helper: &WorkflowHelper,
    options: CallOptions,
) -> Result<()> {
    let available = helper
        .reader_is_available(config.reader.simulator, Some(&config.reader.name), options)
        .await?;
    if !available {
        let name = if config.reader.simulator {
            SIMULATOR_READER
        } else {
            config.reader.name.as_str()
        };
        bail!("Card reader '{}' is not connected", name);
    }
    Ok(())
}

/// Standing handlers for the duration of a workflow: pauses are shown and
/// continued, card insertion is requested (or simulated).
fn workflow_notifications(config: &FileConfig, helper: &WorkflowHelper) -> Vec<Subscription> {
    let continuing = Arc::clone(helper.service());
    let pauses = helper.handle_pause(move |pause| {
        eprint!("{}", ConsoleFormatter::format_pause(&pause));
        if let Err(e) = continuing.continue_workflow() {
            warn!("Could not continue the workflow: {}", e);
        }
    });

    let simulator = config.reader.simulator;
    let inserting = Arc::clone(helper.service());
    let insert_card = helper.handle_insert_card(move |_| {
        if simulator {
            if let Err(e) = inserting.set_card(SIMULATOR_READER, None) {
                warn!("Could not insert the simulated card: {}", e);
            }
        } else {
            eprintln!("Please place your ID card on the reader");
        }
    });

    let progress = helper.handle_auth_status(|status| {
        if let Some(progress) = status.progress {
            info!("Authentication {}% done", progress);
        }
    });

    vec![pauses, insert_card, progress]
}

/// Answer credential prompts until the workflow produces its outcome.
async fn answer_prompts(
    service: &CommandService,
    first: Message,
    credentials: &Credentials<'_>,
    options: CallOptions,
) -> Result<Message> {
    let mut next = first;
    let mut pin_sent = false;
    let mut can_sent = false;

    loop {
        next = match next {
            Message::EnterPin(request) => {
                if pin_sent {
                    let left = request
                        .retry_counter()
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    bail!("The PIN was rejected ({} attempts left)", left);
                }
                pin_sent = true;
                service.set_pin(Some(credentials.pin), options).await?.into()
            }
            Message::EnterCan(_) => {
                if pin_sent || can_sent {
                    bail!("The card was not unlocked; check PIN and CAN");
                }
                let can = credentials
                    .can
                    .context("The card asks for its CAN; pass it with --can")?;
                can_sent = true;
                service.set_can(Some(can), options).await?.into()
            }
            Message::EnterNewPin(_) => {
                let new_pin = credentials
                    .new_pin
                    .context("The SDK unexpectedly asked for a new PIN")?;
                Message::ChangePin(service.set_new_pin(Some(new_pin), options).await?)
            }
            Message::EnterPuk(_) => {
                bail!("The PIN is blocked; unblock it with the PUK first")
            }
            outcome => return Ok(outcome),
        };
    }
}
