//! Workflow helper: standing notification subscriptions and SDK setup.
//!
//! Notifications such as `PAUSE` or `INSERT_CARD` do not answer any single
//! command. Each handler installed here runs on its own subscription to the
//! message bus until the returned [`Subscription`] is unsubscribed or
//! dropped; it never consumes messages from in-flight calls, so the same
//! error can be observed both by a call's rejection and by
//! [`handle_error`](WorkflowHelper::handle_error).

use crate::command_service::CommandService;
use crate::config::CallOptions;
use crate::error::{CommandError, InitializeError};
use ausweis_domain::{
    InsertCard, Message, Pause, ReaderData, Status, Workflow, is_card_deactivated, is_error,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reader name used when none is given.
pub const DEFAULT_READER: &str = "NFC";

/// Name of the SDK's simulated reader.
pub const SIMULATOR_READER: &str = "Simulator";

/// A running notification handler.
#[must_use = "dropping a Subscription removes its handler"]
pub struct Subscription {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Remove the handler.
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Arguments of [`WorkflowHelper::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeOptions {
    /// Enable traffic logging before starting.
    pub logging: bool,
    /// API level the application speaks.
    pub api_level: u32,
    pub start_timeout: Option<Duration>,
    /// Timeout of the API level commands.
    pub command_timeout: Option<Duration>,
}

impl InitializeOptions {
    pub fn new(api_level: u32) -> Self {
        Self {
            logging: false,
            api_level,
            start_timeout: None,
            command_timeout: None,
        }
    }
}

pub struct WorkflowHelper {
    service: Arc<CommandService>,
}

impl WorkflowHelper {
    pub fn new(service: Arc<CommandService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<CommandService> {
        &self.service
    }

    /// Start the SDK and align its API level.
    ///
    /// Fails with [`InitializeError::ApiLevelUnavailable`] when the SDK does
    /// not offer `api_level`. The level is only set when it differs from the
    /// current one.
    pub async fn initialize(&self, options: InitializeOptions) -> Result<(), InitializeError> {
        self.service.log_traffic(options.logging);
        self.service.start(options.start_timeout).await?;

        let call = CallOptions {
            timeout: options.command_timeout,
        };
        let level = self.service.get_api_level(call).await?;
        let available = level.available.unwrap_or_default();
        if !available.contains(&options.api_level) {
            return Err(InitializeError::ApiLevelUnavailable {
                requested: options.api_level,
                available,
            });
        }

        if level.current != Some(options.api_level) {
            debug!(
                "Switching API level from {:?} to {}",
                level.current, options.api_level
            );
            self.service.set_api_level(options.api_level, call).await?;
        }
        Ok(())
    }

    /// Whether the reader needed for the next workflow is attached.
    ///
    /// Looks for [`SIMULATOR_READER`] when `simulator` is set, otherwise for
    /// `reader_name` (default [`DEFAULT_READER`]).
    pub async fn reader_is_available(
        &self,
        simulator: bool,
        reader_name: Option<&str>,
        options: CallOptions,
    ) -> Result<bool, CommandError> {
        let wanted = if simulator {
            SIMULATOR_READER
        } else {
            reader_name.unwrap_or(DEFAULT_READER)
        };
        let list = self.service.get_reader_list(options).await?;
        Ok(list.contains(wanted))
    }

    /// `PAUSE` notifications. The workflow resumes only after
    /// [`CommandService::continue_workflow`].
    pub fn handle_pause(&self, handler: impl FnMut(Pause) + Send + 'static) -> Subscription {
        self.subscribe(
            |message| match message {
                Message::Pause(pause) => Some(pause),
                _ => None,
            },
            handler,
        )
    }

    /// `INSERT_CARD` prompts, e.g. to insert a simulated card.
    pub fn handle_insert_card(
        &self,
        handler: impl FnMut(InsertCard) + Send + 'static,
    ) -> Subscription {
        self.subscribe(
            |message| match message {
                Message::InsertCard(prompt) => Some(prompt),
                _ => None,
            },
            handler,
        )
    }

    /// `READER` messages reporting an inserted, usable card.
    pub fn handle_card_inserted(
        &self,
        handler: impl FnMut(ReaderData) + Send + 'static,
    ) -> Subscription {
        self.subscribe(
            |message| match message {
                Message::Reader(reader)
                    if reader
                        .card
                        .as_ref()
                        .is_some_and(|card| card.deactivated != Some(true)) =>
                {
                    Some(reader)
                }
                _ => None,
            },
            handler,
        )
    }

    /// `STATUS` messages of the authentication workflow.
    pub fn handle_auth_status(
        &self,
        handler: impl FnMut(Status) + Send + 'static,
    ) -> Subscription {
        self.subscribe(
            |message| match message {
                Message::Status(status) if status.workflow == Some(Workflow::Auth) => Some(status),
                _ => None,
            },
            handler,
        )
    }

    /// Every basic or workflow error and every deactivated card, regardless
    /// of which call is in flight.
    pub fn handle_error(&self, handler: impl FnMut(Message) + Send + 'static) -> Subscription {
        self.subscribe(
            |message| (is_error(&message) || is_card_deactivated(&message)).then_some(message),
            handler,
        )
    }

    fn subscribe<T, S, H>(&self, select: S, mut handler: H) -> Subscription
    where
        T: Send + 'static,
        S: Fn(Message) -> Option<T> + Send + 'static,
        H: FnMut(T) + Send + 'static,
    {
        let mut messages = self.service.bus().subscribe();
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    received = messages.recv() => match received {
                        Ok(message) => {
                            if let Some(item) = select(message) {
                                handler(item);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Notification handler lagged, {} messages skipped", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        Subscription { token, handle }
    }
}
