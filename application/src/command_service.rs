//! Public call surface: one typed operation per SDK command.
//!
//! Workflow-agnostic queries (`GET_INFO`, `GET_STATUS`, API level, readers)
//! and `CANCEL` are only failed by basic errors, so that a concurrently
//! failing workflow cannot fail them. Workflow commands are failed by every
//! error, and commands acting on an inserted card additionally reject a
//! deactivated card.
//!
//! See <https://www.ausweisapp.bund.de/sdk/commands.html>.

use crate::bus::MessageBus;
use crate::config::{CallOptions, ServiceConfig};
use crate::correlation::{Correlator, PendingCall};
use crate::error::{CommandError, SessionError};
use crate::ports::traffic_sink::TrafficSink;
use crate::ports::transport::SdkTransport;
use crate::session::{SessionController, SessionState};
use crate::traffic::TrafficLog;
use ausweis_domain::{
    AccessRight, AccessRights, ApiLevel, CanReply, CancelReply, CardPrompt, Certificate,
    ChangePin, Command, Guard, Info, Message, PinReply, PukReply, ReaderData, ReaderList, Reply,
    Simulator, Status, WorkflowMessages,
};
use std::sync::Arc;
use std::time::Duration;

/// Optional arguments of `RUN_AUTH`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOptions {
    /// Enables the SDK's developer mode for test cards.
    pub developer_mode: Option<bool>,
    /// Dismiss the iOS system dialog automatically. API level 1 only.
    pub handle_interrupt: Option<bool>,
    /// Automatic `STATUS` messages. API level 2 and above.
    pub status: Option<bool>,
    pub messages: Option<WorkflowMessages>,
}

/// Optional arguments of `RUN_CHANGE_PIN`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePinOptions {
    pub handle_interrupt: Option<bool>,
    pub status: Option<bool>,
    pub messages: Option<WorkflowMessages>,
}

pub struct CommandService {
    bus: Arc<MessageBus>,
    traffic: Arc<TrafficLog>,
    correlator: Correlator,
    session: SessionController,
}

impl CommandService {
    /// Wire a service onto `transport`.
    pub fn new(transport: Arc<dyn SdkTransport>, config: ServiceConfig) -> Self {
        let bus = Arc::new(MessageBus::new(Arc::clone(&transport)));
        let traffic = Arc::new(TrafficLog::new());
        let correlator = Correlator::new(
            Arc::clone(&transport),
            Arc::clone(&bus),
            Arc::clone(&traffic),
            config.command_timeout,
        );
        let session = SessionController::new(
            transport,
            Arc::clone(&bus),
            Arc::clone(&traffic),
            config.start_timeout,
            config.stop_timeout,
        );
        Self {
            bus,
            traffic,
            correlator,
            session,
        }
    }

    /// Route traffic diagnostics to `sink` instead of `tracing`.
    pub fn with_traffic_sink(self, sink: Arc<dyn TrafficSink>) -> Self {
        self.traffic.set_sink(sink);
        self
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    /// Enable or disable traffic logging. Idempotent.
    pub fn log_traffic(&self, enabled: bool) {
        self.session.log_traffic(enabled);
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    // ==================== Lifecycle ====================

    pub async fn start(&self, timeout: Option<Duration>) -> Result<(), SessionError> {
        self.session.start(timeout).await
    }

    pub async fn stop(&self, timeout: Option<Duration>) -> Result<(), SessionError> {
        self.session.stop(timeout).await
    }

    pub async fn is_running(&self) -> bool {
        self.session.is_running().await
    }

    // ==================== Queries ====================

    pub async fn get_info(&self, options: CallOptions) -> Result<Info, CommandError> {
        self.query(Command::GetInfo, options).await
    }

    pub async fn get_status(&self, options: CallOptions) -> Result<Status, CommandError> {
        self.query(Command::GetStatus, options).await
    }

    pub async fn get_api_level(&self, options: CallOptions) -> Result<ApiLevel, CommandError> {
        self.query(Command::GetApiLevel, options).await
    }

    pub async fn set_api_level(
        &self,
        level: u32,
        options: CallOptions,
    ) -> Result<ApiLevel, CommandError> {
        self.query(Command::SetApiLevel { level }, options).await
    }

    pub async fn get_reader(
        &self,
        name: &str,
        options: CallOptions,
    ) -> Result<ReaderData, CommandError> {
        let command = Command::GetReader {
            name: name.to_string(),
        };
        self.query(command, options).await
    }

    pub async fn get_reader_list(&self, options: CallOptions) -> Result<ReaderList, CommandError> {
        self.query(Command::GetReaderList, options).await
    }

    // ==================== Workflows ====================

    /// Start an authentication; resolves with the requested access rights.
    pub async fn run_auth(
        &self,
        tc_token_url: &str,
        auth: AuthOptions,
        options: CallOptions,
    ) -> Result<AccessRights, CommandError> {
        let command = Command::RunAuth {
            tc_token_url: tc_token_url.to_string(),
            developer_mode: auth.developer_mode,
            handle_interrupt: auth.handle_interrupt,
            status: auth.status,
            messages: auth.messages,
        };
        self.workflow(command, options).await
    }

    pub async fn change_pin(
        &self,
        change: ChangePinOptions,
        options: CallOptions,
    ) -> Result<CardPrompt, CommandError> {
        let command = Command::RunChangePin {
            handle_interrupt: change.handle_interrupt,
            status: change.status,
            messages: change.messages,
        };
        self.workflow(command, options).await
    }

    pub async fn get_access_rights(
        &self,
        options: CallOptions,
    ) -> Result<AccessRights, CommandError> {
        self.workflow(Command::GetAccessRights, options).await
    }

    /// Enable optional access rights; an empty list disables all of them.
    pub async fn set_access_rights(
        &self,
        chat: Vec<AccessRight>,
        options: CallOptions,
    ) -> Result<AccessRights, CommandError> {
        self.workflow(Command::SetAccessRights { chat }, options).await
    }

    pub async fn get_certificate(&self, options: CallOptions) -> Result<Certificate, CommandError> {
        self.workflow(Command::GetCertificate, options).await
    }

    /// Cancel the running workflow. The reply is the workflow's final
    /// (failed) message, so only basic errors reject it.
    pub async fn cancel(&self, options: CallOptions) -> Result<CancelReply, CommandError> {
        self.query(Command::Cancel, options).await
    }

    // ==================== Card ====================

    pub async fn accept(&self, options: CallOptions) -> Result<CardPrompt, CommandError> {
        self.card(Command::Accept, options).await
    }

    /// `value` is omitted when the reader has a keypad.
    pub async fn set_pin(
        &self,
        value: Option<&str>,
        options: CallOptions,
    ) -> Result<PinReply, CommandError> {
        let command = Command::SetPin {
            value: value.map(str::to_string),
        };
        self.card(command, options).await
    }

    pub async fn set_new_pin(
        &self,
        value: Option<&str>,
        options: CallOptions,
    ) -> Result<ChangePin, CommandError> {
        let command = Command::SetNewPin {
            value: value.map(str::to_string),
        };
        self.card(command, options).await
    }

    pub async fn set_can(
        &self,
        value: Option<&str>,
        options: CallOptions,
    ) -> Result<CanReply, CommandError> {
        let command = Command::SetCan {
            value: value.map(str::to_string),
        };
        self.card(command, options).await
    }

    pub async fn set_puk(
        &self,
        value: Option<&str>,
        options: CallOptions,
    ) -> Result<PukReply, CommandError> {
        let command = Command::SetPuk {
            value: value.map(str::to_string),
        };
        self.card(command, options).await
    }

    // ==================== Fire-and-forget ====================

    /// Insert a virtual card into `name`.
    pub fn set_card(&self, name: &str, simulator: Option<Simulator>) -> Result<(), CommandError> {
        let command = Command::SetCard {
            name: name.to_string(),
            simulator,
        };
        self.correlator.send_without_result(&command)
    }

    /// Interrupt the iOS system dialog.
    pub fn interrupt(&self) -> Result<(), CommandError> {
        self.correlator.send_without_result(&Command::Interrupt)
    }

    /// Resume a workflow after a `PAUSE`.
    pub fn continue_workflow(&self) -> Result<(), CommandError> {
        self.correlator.send_without_result(&Command::Continue)
    }

    // ==================== Generic ====================

    /// Send an arbitrary correlated call.
    pub async fn invoke(&self, call: PendingCall) -> Result<Message, CommandError> {
        self.correlator.invoke(call).await
    }

    async fn query<R: Reply>(
        &self,
        command: Command,
        options: CallOptions,
    ) -> Result<R, CommandError> {
        let call = PendingCall::expecting::<R>(command)
            .basic_errors_only()
            .with_timeout(options.timeout);
        self.correlator.invoke_as(call).await
    }

    async fn workflow<R: Reply>(
        &self,
        command: Command,
        options: CallOptions,
    ) -> Result<R, CommandError> {
        let call = PendingCall::expecting::<R>(command).with_timeout(options.timeout);
        self.correlator.invoke_as(call).await
    }

    async fn card<R: Reply>(
        &self,
        command: Command,
        options: CallOptions,
    ) -> Result<R, CommandError> {
        let call = PendingCall::expecting::<R>(command)
            .with_guard(Guard::CARD_DEACTIVATED)
            .with_timeout(options.timeout);
        self.correlator.invoke_as(call).await
    }
}
