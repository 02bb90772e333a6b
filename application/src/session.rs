//! Session lifecycle controller.
//!
//! `Stopped → Starting → Running → Stopping → Stopped`. Start and stop are
//! idempotent: when the transport already is in the requested state the
//! call warns and returns without awaiting a pulse.
//!
//! Overlapping start/stop pairs are not serialized here; callers must not
//! issue them concurrently.

use crate::bus::MessageBus;
use crate::error::SessionError;
use crate::ports::transport::{SdkTransport, TransportError};
use crate::traffic::TrafficLog;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Stopped => "stopped",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
        };
        f.write_str(label)
    }
}

pub struct SessionController {
    transport: Arc<dyn SdkTransport>,
    bus: Arc<MessageBus>,
    traffic: Arc<TrafficLog>,
    start_timeout: Duration,
    stop_timeout: Duration,
    state: Mutex<SessionState>,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn SdkTransport>,
        bus: Arc<MessageBus>,
        traffic: Arc<TrafficLog>,
        start_timeout: Duration,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            bus,
            traffic,
            start_timeout,
            stop_timeout,
            state: Mutex::new(SessionState::Stopped),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *current != state {
            debug!("Session {} -> {}", *current, state);
            *current = state;
        }
    }

    pub async fn is_running(&self) -> bool {
        self.transport.is_running().await
    }

    /// Bring the SDK up and wait for its connected pulse.
    pub async fn start(&self, timeout: Option<Duration>) -> Result<(), SessionError> {
        if self.transport.is_running().await {
            warn!("SDK already started");
            self.set_state(SessionState::Running);
            return Ok(());
        }

        let timeout = timeout.unwrap_or(self.start_timeout);
        let mut connected = self.transport.connected();
        let mut errors = self.transport.errors();
        self.set_state(SessionState::Starting);

        let result = match self.transport.start() {
            Ok(()) => Self::await_pulse("start", timeout, &mut connected, &mut errors).await,
            Err(source) => Err(SessionError::Transport {
                action: "start",
                source,
            }),
        };

        match result {
            Ok(()) => {
                self.set_state(SessionState::Running);
                info!("SDK started");
                Ok(())
            }
            Err(e) => {
                self.set_state(SessionState::Stopped);
                Err(e)
            }
        }
    }

    /// Bring the SDK down, wait for its disconnected pulse and disable
    /// traffic logging.
    pub async fn stop(&self, timeout: Option<Duration>) -> Result<(), SessionError> {
        if !self.transport.is_running().await {
            warn!("SDK already stopped");
            self.set_state(SessionState::Stopped);
            return Ok(());
        }

        let timeout = timeout.unwrap_or(self.stop_timeout);
        let mut disconnected = self.transport.disconnected();
        let mut errors = self.transport.errors();
        self.set_state(SessionState::Stopping);

        let result = match self.transport.stop() {
            Ok(()) => Self::await_pulse("stop", timeout, &mut disconnected, &mut errors).await,
            Err(source) => Err(SessionError::Transport {
                action: "stop",
                source,
            }),
        };

        match result {
            Ok(()) => {
                self.set_state(SessionState::Stopped);
                self.traffic.disable();
                info!("SDK stopped");
                Ok(())
            }
            Err(e) => {
                // The transport never confirmed going down.
                self.set_state(SessionState::Running);
                Err(e)
            }
        }
    }

    /// Toggle traffic logging on the session's message bus.
    pub fn log_traffic(&self, enabled: bool) {
        self.traffic.set_enabled(enabled, &self.bus);
    }

    async fn await_pulse(
        action: &'static str,
        timeout: Duration,
        pulses: &mut broadcast::Receiver<()>,
        errors: &mut broadcast::Receiver<String>,
    ) -> Result<(), SessionError> {
        let race = async {
            loop {
                tokio::select! {
                    pulse = pulses.recv() => match pulse {
                        Ok(()) | Err(RecvError::Lagged(_)) => return Ok(()),
                        Err(RecvError::Closed) => {
                            return Err(SessionError::Transport {
                                action,
                                source: TransportError::Closed,
                            });
                        }
                    },
                    error = errors.recv() => match error {
                        Ok(payload) => {
                            return Err(SessionError::Transport {
                                action,
                                source: TransportError::Sdk(payload),
                            });
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => {
                            return Err(SessionError::Transport {
                                action,
                                source: TransportError::Closed,
                            });
                        }
                    },
                }
            }
        };

        tokio::time::timeout(timeout, race)
            .await
            .unwrap_or_else(|_| Err(SessionError::Timeout { action, timeout }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedSdk;

    fn controller(sdk: &Arc<ScriptedSdk>, timeout: Duration) -> SessionController {
        let transport: Arc<dyn SdkTransport> = sdk.clone();
        let bus = Arc::new(MessageBus::new(Arc::clone(&transport)));
        SessionController::new(transport, bus, Arc::new(TrafficLog::new()), timeout, timeout)
    }

    #[tokio::test]
    async fn start_twice_starts_once() {
        let sdk = ScriptedSdk::shared();
        let session = controller(&sdk, Duration::from_secs(1));

        session.start(None).await.unwrap();
        session.start(None).await.unwrap();

        assert_eq!(sdk.starts(), 1);
        assert_eq!(sdk.connected_pulses(), 1);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[tokio::test]
    async fn stop_twice_stops_once() {
        let sdk = ScriptedSdk::shared();
        let session = controller(&sdk, Duration::from_secs(1));
        session.start(None).await.unwrap();

        session.stop(None).await.unwrap();
        session.stop(None).await.unwrap();

        assert_eq!(sdk.stops(), 1);
        assert_eq!(sdk.disconnected_pulses(), 1);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let sdk = ScriptedSdk::shared();
        let session = controller(&sdk, Duration::from_secs(1));

        session.stop(None).await.unwrap();
        assert_eq!(sdk.stops(), 0);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn missing_connected_pulse_times_out() {
        let sdk = ScriptedSdk::shared();
        sdk.silence_lifecycle();
        let session = controller(&sdk, Duration::from_secs(5));

        let error = session
            .start(Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(error.is_timeout());
        assert_eq!(error.to_string(), "SDK did not start within 100ms");
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn transport_error_fails_start() {
        let sdk = ScriptedSdk::shared();
        sdk.silence_lifecycle();
        let session = controller(&sdk, Duration::from_secs(1));

        let starting = session.start(None);
        let failing = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sdk.emit_error("NFC not available");
        };
        let (result, ()) = tokio::join!(starting, failing);

        match result.unwrap_err() {
            SessionError::Transport { action, source } => {
                assert_eq!(action, "start");
                assert_eq!(source, TransportError::Sdk("NFC not available".into()));
            }
            other => panic!("expected transport error, got {other}"),
        }
    }

    #[tokio::test]
    async fn stop_disables_traffic_logging() {
        let sdk = ScriptedSdk::shared();
        let session = controller(&sdk, Duration::from_secs(1));
        session.log_traffic(true);
        session.start(None).await.unwrap();
        assert!(session.traffic.is_enabled());

        session.stop(None).await.unwrap();
        assert!(!session.traffic.is_enabled());
    }
}
