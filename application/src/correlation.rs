//! Command/response correlation.
//!
//! The SDK never echoes a request identifier, so a reply is matched to its
//! command by shape and timing alone:
//!
//! 1. subscribe to the transport's message and error streams,
//! 2. transmit the command,
//! 3. resolve with the first message of an expected kind, unless an earlier
//!    message is classified as an error for this call, a transport error
//!    arrives, or the deadline passes.
//!
//! Both subscriptions are taken on the transport itself before transmitting,
//! so a call observes exactly the frames delivered after it subscribed and
//! nothing still buffered from earlier traffic. Per message the order is
//! fixed: error classification, then the optional [`Guard`], then the
//! expected-kind filter, so an error `AUTH` never satisfies a call that also
//! expects `AUTH`.
//!
//! Messages of no interest to a call (e.g. a `PAUSE` while waiting for
//! `ENTER_PIN`) are skipped and stay visible to every other subscriber.
//!
//! Correlation is only sound while one workflow command is outstanding at a
//! time. Each call gets a sequence number; sending a workflow command while
//! another one is in flight is reported, not prevented.

use crate::bus::{MessageBus, MessageReceiver};
use crate::error::CommandError;
use crate::ports::transport::{SdkTransport, TransportError};
use crate::traffic::TrafficLog;
use ausweis_domain::{Command, ErrorClass, ErrorScope, Guard, Message, MessageKind, Reply};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// One correlated call, built per invocation and consumed by
/// [`Correlator::invoke`].
#[derive(Debug, Clone)]
pub struct PendingCall {
    command: Command,
    expected: &'static [MessageKind],
    scope: ErrorScope,
    guard: Option<Guard>,
    timeout: Option<Duration>,
}

impl PendingCall {
    pub fn new(command: Command, expected: &'static [MessageKind]) -> Self {
        Self {
            command,
            expected,
            scope: ErrorScope::All,
            guard: None,
            timeout: None,
        }
    }

    /// A call resolving with reply type `R`.
    pub fn expecting<R: Reply>(command: Command) -> Self {
        Self::new(command, R::EXPECTED)
    }

    /// Only basic errors reject this call.
    pub fn basic_errors_only(self) -> Self {
        self.with_scope(ErrorScope::BasicOnly)
    }

    pub fn with_scope(mut self, scope: ErrorScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Overrides the correlator's default deadline. `None` keeps it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn expected(&self) -> &'static [MessageKind] {
        self.expected
    }

    pub fn scope(&self) -> ErrorScope {
        self.scope
    }
}

/// The send-and-await-one-reply primitive.
pub struct Correlator {
    transport: Arc<dyn SdkTransport>,
    bus: Arc<MessageBus>,
    traffic: Arc<TrafficLog>,
    default_timeout: Duration,
    next_call_id: AtomicU64,
    workflow_in_flight: Arc<Mutex<Option<(u64, &'static str)>>>,
}

impl Correlator {
    pub fn new(
        transport: Arc<dyn SdkTransport>,
        bus: Arc<MessageBus>,
        traffic: Arc<TrafficLog>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            bus,
            traffic,
            default_timeout,
            next_call_id: AtomicU64::new(1),
            workflow_in_flight: Arc::new(Mutex::new(None)),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Transmit `call`'s command and await its single terminal outcome.
    ///
    /// Resolves with the first message of an expected kind. Rejects with
    /// the classified error message, a guard hit, a transport error, or
    /// [`CommandError::Timeout`]. Both subscriptions are released on every
    /// path when the returned future completes or is dropped.
    pub async fn invoke(&self, call: PendingCall) -> Result<Message, CommandError> {
        let command_name = call.command.name();
        if call.expected.is_empty() {
            return Err(CommandError::NothingExpected {
                command: command_name,
            });
        }

        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let timeout = call.timeout.unwrap_or(self.default_timeout);
        let deadline = Instant::now() + timeout;

        let mut messages = self.bus.subscribe();
        let mut errors = self.transport.errors();
        let _workflow = call
            .command
            .is_workflow()
            .then(|| self.enter_workflow(call_id, command_name));

        self.transmit(&call.command)?;
        debug!(
            "Call #{} {} awaiting {:?} (scope {:?}, timeout {}ms)",
            call_id,
            command_name,
            call.expected,
            call.scope,
            timeout.as_millis()
        );

        let reply = Self::await_reply(&call, &mut messages, &mut errors);
        let outcome = tokio::time::timeout_at(deadline, reply)
            .await
            .unwrap_or_else(|_| {
                Err(CommandError::Timeout {
                    command: command_name,
                    timeout,
                })
            });

        match &outcome {
            Ok(message) => debug!(
                "Call #{} {} resolved with {}",
                call_id,
                command_name,
                message.kind()
            ),
            Err(e) => debug!("Call #{} failed: {}", call_id, e),
        }
        outcome
    }

    /// [`invoke`](Self::invoke) narrowed to the reply type `R`.
    pub async fn invoke_as<R: Reply>(&self, call: PendingCall) -> Result<R, CommandError> {
        let command = call.command.name();
        let message = self.invoke(call).await?;
        R::from_message(message).map_err(|message| CommandError::UnexpectedReply {
            command,
            message: Box::new(message),
        })
    }

    /// Transmit a command that has no defined reply.
    pub fn send_without_result(&self, command: &Command) -> Result<(), CommandError> {
        self.transmit(command)?;
        debug!("Sent {} without awaiting a reply", command.name());
        Ok(())
    }

    fn transmit(&self, command: &Command) -> Result<(), CommandError> {
        let frame = command.encode()?;
        self.traffic.publish_command(command);
        self.transport
            .transmit(frame)
            .map_err(|source| CommandError::Transmit {
                command: command.name(),
                source,
            })
    }

    async fn await_reply(
        call: &PendingCall,
        messages: &mut MessageReceiver,
        errors: &mut broadcast::Receiver<String>,
    ) -> Result<Message, CommandError> {
        let command = call.command.name();
        loop {
            tokio::select! {
                received = messages.recv() => match received {
                    Ok(message) => {
                        if let Some(class) = call.scope.rejects(&message) {
                            let message = Box::new(message);
                            return Err(match class {
                                ErrorClass::Protocol => CommandError::Protocol { command, message },
                                ErrorClass::Workflow => CommandError::Workflow { command, message },
                            });
                        }
                        if let Some(guard) = call.guard
                            && guard.rejects(&message)
                        {
                            return Err(CommandError::Guarded {
                                command,
                                guard: guard.name(),
                                message: Box::new(message),
                            });
                        }
                        if call.expected.contains(&message.kind()) {
                            return Ok(message);
                        }
                        trace!("{} ignores {} while awaiting its reply", command, message.kind());
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("{} lagged behind the SDK, {} frames skipped", command, skipped);
                    }
                    Err(RecvError::Closed) => return Err(CommandError::TransportClosed { command }),
                },
                error = errors.recv() => match error {
                    Ok(payload) => {
                        return Err(CommandError::Transport {
                            command,
                            source: TransportError::Sdk(payload),
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("{} lagged behind SDK errors, {} skipped", command, skipped);
                    }
                    Err(RecvError::Closed) => return Err(CommandError::TransportClosed { command }),
                },
            }
        }
    }

    fn enter_workflow(&self, call_id: u64, command: &'static str) -> WorkflowSlot {
        let mut in_flight = self
            .workflow_in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some((other_id, other)) = *in_flight {
            warn!(
                "{} (call #{}) sent while {} (call #{}) is still awaiting its reply; \
                 replies may be misattributed",
                command, call_id, other, other_id
            );
        }
        *in_flight = Some((call_id, command));
        WorkflowSlot {
            call_id,
            in_flight: Arc::clone(&self.workflow_in_flight),
        }
    }
}

/// Marks a workflow call as in flight until dropped.
struct WorkflowSlot {
    call_id: u64,
    in_flight: Arc<Mutex<Option<(u64, &'static str)>>>,
}

impl Drop for WorkflowSlot {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.is_some_and(|(id, _)| id == self.call_id) {
            *in_flight = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedSdk;
    use ausweis_domain::{CardPrompt, Info, ReaderData, ReaderList};

    const INFO: &str = r#"{"msg":"INFO","VersionInfo":{"Name":"AusweisApp2","Implementation-Title":"AusweisApp2","Implementation-Vendor":"Governikus GmbH & Co. KG","Implementation-Version":"1.26.4","Specification-Title":"TR-03124-1","Specification-Vendor":"Federal Office for Information Security","Specification-Version":"1.4"}}"#;

    fn correlator(sdk: &Arc<ScriptedSdk>) -> Correlator {
        let transport: Arc<dyn SdkTransport> = sdk.clone();
        let bus = Arc::new(MessageBus::new(Arc::clone(&transport)));
        Correlator::new(
            transport,
            bus,
            Arc::new(TrafficLog::new()),
            Duration::from_secs(5),
        )
    }

    fn in_flight(correlator: &Correlator) -> Option<&'static str> {
        correlator
            .workflow_in_flight
            .lock()
            .unwrap()
            .map(|(_, command)| command)
    }

    #[test]
    fn pending_call_defaults_to_every_error() {
        let call = PendingCall::expecting::<Info>(Command::GetInfo);
        assert_eq!(call.command(), &Command::GetInfo);
        assert_eq!(call.expected(), &[MessageKind::Info]);
        assert_eq!(call.scope(), ErrorScope::All);

        assert_eq!(call.clone().basic_errors_only().scope(), ErrorScope::BasicOnly);
        assert_eq!(
            call.with_scope(ErrorScope::BasicOnly).scope(),
            ErrorScope::BasicOnly
        );
    }

    #[tokio::test]
    async fn resolves_with_first_expected_kind() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(
            Command::GetReaderList,
            &[
                r#"{"msg":"STATUS","workflow":null,"progress":null,"state":null}"#,
                r#"{"msg":"READER_LIST","readers":[{"name":"NFC","attached":true,"card":null}]}"#,
            ],
        );
        let correlator = correlator(&sdk);

        let call = PendingCall::expecting::<ReaderList>(Command::GetReaderList).basic_errors_only();
        let list: ReaderList = correlator.invoke_as(call).await.unwrap();
        assert!(list.contains("NFC"));
        sdk.assert_script_consumed();
    }

    #[tokio::test]
    async fn frames_received_before_the_call_are_not_its_reply() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(Command::GetInfo, &[]);
        let correlator = correlator(&sdk);

        // an earlier subscriber keeps the frame buffered on the transport
        let _earlier = correlator.bus.subscribe();
        sdk.emit(INFO);
        let call = PendingCall::expecting::<Info>(Command::GetInfo)
            .basic_errors_only()
            .with_timeout(Some(Duration::from_millis(300)));

        let error = correlator.invoke(call).await.unwrap_err();
        assert!(error.is_timeout());
    }

    #[tokio::test]
    async fn error_classification_runs_before_kind_filter() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(
            Command::SetPin {
                value: Some("123456".into()),
            },
            &[r#"{"msg":"AUTH","error":"Authentication failed"}"#],
        );
        let correlator = correlator(&sdk);

        let call = PendingCall::new(
            Command::SetPin {
                value: Some("123456".into()),
            },
            &[MessageKind::EnterPin, MessageKind::Auth],
        );
        let error = correlator.invoke(call).await.unwrap_err();
        assert!(matches!(
            error,
            CommandError::Workflow {
                command: "SET_PIN",
                ..
            }
        ));
        assert_eq!(error.message().unwrap().kind(), MessageKind::Auth);
    }

    #[tokio::test]
    async fn failed_auth_with_unlisted_reason_is_a_workflow_error() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(
            Command::SetPin {
                value: Some("123456".into()),
            },
            &[
                r#"{"msg":"AUTH","result":{"major":"http://www.bsi.bund.de/ecard/api/1.1/resultmajor#error","reason":"Some_Future_Reason"}}"#,
            ],
        );
        let correlator = correlator(&sdk);

        let call = PendingCall::new(
            Command::SetPin {
                value: Some("123456".into()),
            },
            &[MessageKind::EnterPin, MessageKind::Auth],
        )
        .with_timeout(Some(Duration::from_secs(1)));
        let error = correlator.invoke(call).await.unwrap_err();
        assert!(matches!(error, CommandError::Workflow { .. }));
        assert_eq!(
            error.failure_code().map(|code| code.as_str().to_string()),
            Some("Some_Future_Reason".to_string())
        );
    }

    #[tokio::test]
    async fn out_of_band_transport_error_fails_call() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(Command::GetInfo, &[]);
        let correlator = correlator(&sdk);

        let waiting = correlator.invoke(PendingCall::expecting::<Info>(Command::GetInfo));
        let emitter = {
            let sdk = Arc::clone(&sdk);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                sdk.emit_error("NFC adapter lost");
            }
        };
        let (result, ()) = tokio::join!(waiting, emitter);

        match result.unwrap_err() {
            CommandError::Transport { source, .. } => {
                assert_eq!(source, TransportError::Sdk("NFC adapter lost".into()));
            }
            other => panic!("expected transport error, got {other}"),
        }
    }

    #[tokio::test]
    async fn transmit_failure_is_reported() {
        let sdk = ScriptedSdk::shared();
        sdk.fail_transmit(TransportError::NotRunning);
        let correlator = correlator(&sdk);

        let error = correlator
            .invoke(PendingCall::expecting::<Info>(Command::GetInfo))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            CommandError::Transmit {
                source: TransportError::NotRunning,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn empty_expectation_is_rejected_before_sending() {
        let sdk = ScriptedSdk::shared();
        let correlator = correlator(&sdk);

        let error = correlator
            .invoke(PendingCall::new(Command::Accept, &[]))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            CommandError::NothingExpected { command: "ACCEPT" }
        ));
        assert!(sdk.transmitted().is_empty());
    }

    #[tokio::test]
    async fn guard_applies_only_to_opted_in_calls() {
        let deactivated = r#"{"msg":"READER","name":"NFC","attached":true,"card":{"deactivated":true,"inoperative":false,"retryCounter":3}}"#;
        let sdk = ScriptedSdk::shared();
        sdk.expect(Command::Accept, &[deactivated]);
        sdk.expect(Command::GetReader { name: "NFC".into() }, &[deactivated]);
        let correlator = correlator(&sdk);

        let guarded = PendingCall::expecting::<CardPrompt>(Command::Accept)
            .with_guard(Guard::CARD_DEACTIVATED);
        let error = correlator.invoke(guarded).await.unwrap_err();
        assert!(matches!(
            error,
            CommandError::Guarded {
                guard: "card_deactivated",
                ..
            }
        ));

        let plain = PendingCall::expecting::<ReaderData>(Command::GetReader { name: "NFC".into() })
            .basic_errors_only();
        let reader = correlator.invoke(plain).await.unwrap();
        assert_eq!(reader.kind(), MessageKind::Reader);
    }

    #[tokio::test]
    async fn overlapping_workflow_calls_still_resolve() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(
            Command::GetAccessRights,
            &[r#"{"msg":"ACCESS_RIGHTS","chat":{"effective":[],"optional":[],"required":[]}}"#],
        );
        sdk.expect(
            Command::GetCertificate,
            &[
                r#"{"msg":"CERTIFICATE","description":{"issuerName":"i","issuerUrl":"u","subjectName":"s","subjectUrl":"u","termsOfUsage":"t","purpose":"p"},"validity":{"effectiveDate":"a","expirationDate":"b"}}"#,
            ],
        );
        let correlator = correlator(&sdk);

        let rights = correlator.invoke(PendingCall::new(
            Command::GetAccessRights,
            &[MessageKind::AccessRights],
        ));
        let certificate = correlator.invoke(PendingCall::new(
            Command::GetCertificate,
            &[MessageKind::Certificate],
        ));
        let (rights, certificate) = tokio::join!(rights, certificate);

        assert_eq!(rights.unwrap().kind(), MessageKind::AccessRights);
        assert_eq!(certificate.unwrap().kind(), MessageKind::Certificate);
        assert_eq!(in_flight(&correlator), None);
    }

    #[tokio::test]
    async fn basic_only_cancel_is_tracked_as_a_workflow_call() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(Command::Cancel, &[]);
        let correlator = correlator(&sdk);

        let call = PendingCall::expecting::<Info>(Command::Cancel)
            .basic_errors_only()
            .with_timeout(Some(Duration::from_millis(200)));
        let cancel = correlator.invoke(call);
        let observer = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            in_flight(&correlator)
        };
        let (result, observed) = tokio::join!(cancel, observer);

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(observed, Some("CANCEL"));
        assert_eq!(in_flight(&correlator), None);
    }

    #[tokio::test]
    async fn queries_do_not_occupy_the_workflow_slot() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(Command::GetInfo, &[]);
        let correlator = correlator(&sdk);

        let call = PendingCall::expecting::<Info>(Command::GetInfo)
            .with_timeout(Some(Duration::from_millis(200)));
        let query = correlator.invoke(call);
        let observer = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            in_flight(&correlator)
        };
        let (result, observed) = tokio::join!(query, observer);

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(observed, None);
    }

    #[tokio::test]
    async fn fire_and_forget_only_transmits() {
        let sdk = ScriptedSdk::shared();
        sdk.expect(Command::Continue, &[]);
        let correlator = correlator(&sdk);

        correlator.send_without_result(&Command::Continue).unwrap();
        assert_eq!(sdk.transmitted(), vec![r#"{"cmd":"CONTINUE"}"#.to_string()]);
    }
}
