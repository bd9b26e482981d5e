//! Voice Controller
//!
//! Drives the idle → connecting → connected/error lifecycle of one realtime
//! voice session and owns the session handle for as long as it is live.
//!
//! The handle lives in a `Slot` guarded by a mutex that is never held across
//! the token fetch or the session connect. A busy flag rejects overlapping
//! attempts, and an attempt counter lets a disconnect invalidate an attempt
//! that is still pending: when that attempt finishes, its session is closed
//! instead of stored. An attempt whose future is dropped before it settles
//! clears the busy flag and returns the controller to idle.

use crate::{
    DEFAULT_REALTIME_MODEL,
    agent::RealtimeAgent,
    broker::{TokenError, TokenSource},
    session::{RealtimeSession, SessionError, SessionFactory},
    state::{ConnectionStatus, ControllerState},
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

/// Message shown when a failure carries no text of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Error desconocido";

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("A connection attempt is already in progress")]
    Busy,
    #[error("A realtime session is already connected")]
    AlreadyConnected,
    #[error("Connection attempt was cancelled by a disconnect")]
    Superseded,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

struct Slot<S> {
    session: Option<S>,
    busy: bool,
    attempt: u64,
}

/// Owns a single realtime session and the state a view renders from.
pub struct VoiceController<T, F>
where
    T: TokenSource,
    F: SessionFactory,
{
    tokens: T,
    sessions: F,
    agent: RealtimeAgent,
    model: String,
    slot: Mutex<Slot<F::Session>>,
    state_tx: watch::Sender<ControllerState>,
}

impl<T, F> VoiceController<T, F>
where
    T: TokenSource,
    F: SessionFactory,
{
    /// Creates an idle controller using the default agent and realtime model.
    pub fn new(tokens: T, sessions: F) -> Self {
        let (state_tx, _) = watch::channel(ControllerState::idle());
        Self {
            tokens,
            sessions,
            agent: RealtimeAgent::default(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            slot: Mutex::new(Slot {
                session: None,
                busy: false,
                attempt: 0,
            }),
            state_tx,
        }
    }

    pub fn with_agent(mut self, agent: RealtimeAgent) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Current state snapshot.
    pub fn state(&self) -> ControllerState {
        self.state_tx.borrow().clone()
    }

    /// Returns a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state_tx.subscribe()
    }

    /// Fetches a credential, builds a session and connects it.
    ///
    /// Rejected with [`ControllerError::Busy`] while another attempt is pending and
    /// with [`ControllerError::AlreadyConnected`] while a session is held. Any other
    /// failure leaves the controller in [`ConnectionStatus::Error`].
    pub async fn connect(&self) -> Result<(), ControllerError> {
        let mut pending = {
            let mut slot = self.slot.lock();
            if slot.busy {
                return Err(ControllerError::Busy);
            }
            if slot.session.is_some() {
                return Err(ControllerError::AlreadyConnected);
            }
            slot.busy = true;
            slot.attempt += 1;
            self.publish(ControllerState::connecting());
            PendingAttempt {
                slot: &self.slot,
                state_tx: &self.state_tx,
                attempt: slot.attempt,
                settled: false,
            }
        };
        let attempt = pending.attempt;
        info!(attempt, model = %self.model, "Connecting realtime session...");

        let outcome = self.establish().await;
        pending.settled = true;

        let mut slot = self.slot.lock();
        if slot.attempt != attempt {
            if let Ok(mut session) = outcome {
                release(&mut session);
            }
            info!(attempt, "Connection attempt superseded by a disconnect.");
            return Err(ControllerError::Superseded);
        }
        slot.busy = false;

        match outcome {
            Ok(session) => {
                slot.session = Some(session);
                self.publish(ControllerState::connected());
                info!(attempt, "Realtime session connected.");
                Ok(())
            }
            Err(err) => {
                warn!(attempt, error = %err, "Realtime connection failed.");
                self.publish(ControllerState::failed(error_message(&err)));
                Err(err)
            }
        }
    }

    /// Closes the held session, if any, and returns to idle. Never fails.
    pub async fn disconnect(&self) {
        let mut slot = self.slot.lock();
        Self::clear(&mut slot);
        self.publish(ControllerState::idle());
        info!("Realtime session disconnected.");
    }

    /// Disconnects when connected, connects otherwise.
    pub async fn toggle(&self) -> Result<(), ControllerError> {
        if self.state().status == ConnectionStatus::Connected {
            self.disconnect().await;
            Ok(())
        } else {
            self.connect().await
        }
    }

    async fn establish(&self) -> Result<F::Session, ControllerError> {
        let credential = self.tokens.fetch_token().await?;
        let mut session = self.sessions.create(&self.agent, &self.model)?;
        if let Err(err) = session.connect(&credential).await {
            release(&mut session);
            return Err(err.into());
        }
        Ok(session)
    }

    fn clear(slot: &mut Slot<F::Session>) {
        slot.attempt += 1;
        slot.busy = false;
        if let Some(mut session) = slot.session.take() {
            release(&mut session);
        }
    }

    fn publish(&self, state: ControllerState) {
        self.state_tx.send_replace(state);
    }
}

impl<T, F> Drop for VoiceController<T, F>
where
    T: TokenSource,
    F: SessionFactory,
{
    fn drop(&mut self) {
        Self::clear(self.slot.get_mut());
        self.publish(ControllerState::idle());
    }
}

/// Bookkeeping for an attempt between `connect` marking the slot busy and the
/// attempt settling.
struct PendingAttempt<'a, S> {
    slot: &'a Mutex<Slot<S>>,
    state_tx: &'a watch::Sender<ControllerState>,
    attempt: u64,
    settled: bool,
}

impl<S> Drop for PendingAttempt<'_, S> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut slot = self.slot.lock();
        // A disconnect may already have moved on past this attempt.
        if slot.attempt != self.attempt {
            return;
        }
        slot.attempt += 1;
        slot.busy = false;
        self.state_tx.send_replace(ControllerState::idle());
        info!(attempt = self.attempt, "Connection attempt cancelled.");
    }
}

/// Best-effort close: failures are logged, never propagated.
fn release<S: RealtimeSession>(session: &mut S) {
    if let Err(err) = session.close() {
        warn!(error = %err, "Failed to close realtime session.");
    }
}

fn error_message(err: &ControllerError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        broker::MockTokenSource,
        session::{MockRealtimeSession, SessionCredential},
    };
    use async_trait::async_trait;
    use std::{sync::Arc, time::Duration};
    use tokio::sync::Notify;

    /// Hands out pre-configured mock sessions, newest last.
    struct FakeFactory {
        sessions: std::sync::Mutex<Vec<MockRealtimeSession>>,
    }

    impl FakeFactory {
        fn with(sessions: Vec<MockRealtimeSession>) -> Self {
            Self {
                sessions: std::sync::Mutex::new(sessions),
            }
        }

        fn empty() -> Self {
            Self::with(vec![])
        }
    }

    impl SessionFactory for FakeFactory {
        type Session = MockRealtimeSession;

        fn create(&self, agent: &RealtimeAgent, model: &str) -> Result<Self::Session, SessionError> {
            assert_eq!(agent.name, "Assistant");
            assert_eq!(model, "gpt-realtime");
            self.sessions
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| SessionError::InvalidConfig("no session prepared".into()))
        }
    }

    /// Holds the token fetch open until the test releases it.
    struct GatedTokens {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl TokenSource for GatedTokens {
        async fn fetch_token(&self) -> Result<SessionCredential, TokenError> {
            self.gate.notified().await;
            Ok(SessionCredential::new("late"))
        }
    }

    fn tokens_returning(value: &'static str) -> MockTokenSource {
        let mut tokens = MockTokenSource::new();
        tokens
            .expect_fetch_token()
            .times(1)
            .returning(move || Ok(SessionCredential::new(value)));
        tokens
    }

    fn session_expecting(token: &'static str, closes: usize) -> MockRealtimeSession {
        let mut session = MockRealtimeSession::new();
        session
            .expect_connect()
            .withf(move |credential| credential.expose() == token)
            .times(1)
            .returning(|_| Ok(()));
        session.expect_close().times(closes).returning(|| Ok(()));
        session
    }

    #[tokio::test]
    async fn test_connect_success() {
        let controller = VoiceController::new(
            tokens_returning("abc123"),
            FakeFactory::with(vec![session_expecting("abc123", 1)]),
        );

        controller.connect().await.unwrap();

        let state = controller.state();
        assert_eq!(state.status, ConnectionStatus::Connected);
        assert!(state.listening);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_connect_relays_token_error() {
        let mut tokens = MockTokenSource::new();
        tokens
            .expect_fetch_token()
            .times(1)
            .returning(|| Err(TokenError::Rejected("unauthorized".into())));
        let controller = VoiceController::new(tokens, FakeFactory::empty());

        let err = controller.connect().await.unwrap_err();
        assert!(matches!(err, ControllerError::Token(_)));

        let state = controller.state();
        assert_eq!(state.status, ConnectionStatus::Error);
        assert_eq!(state.error.as_deref(), Some("unauthorized"));
        assert!(!state.listening);
    }

    #[tokio::test]
    async fn test_empty_error_uses_fallback_message() {
        let mut tokens = MockTokenSource::new();
        tokens
            .expect_fetch_token()
            .returning(|| Err(TokenError::Rejected(String::new())));
        let controller = VoiceController::new(tokens, FakeFactory::empty());

        let _ = controller.connect().await;
        assert_eq!(
            controller.state().error.as_deref(),
            Some(UNKNOWN_ERROR_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_failed_connect_closes_constructed_session() {
        let mut session = MockRealtimeSession::new();
        session
            .expect_connect()
            .times(1)
            .returning(|_| Err(SessionError::Connect("handshake refused".into())));
        session.expect_close().times(1).returning(|| Ok(()));
        let controller = VoiceController::new(
            tokens_returning("abc123"),
            FakeFactory::with(vec![session]),
        );

        let err = controller.connect().await.unwrap_err();
        assert!(matches!(err, ControllerError::Session(_)));

        let state = controller.state();
        assert_eq!(state.status, ConnectionStatus::Error);
        assert_eq!(
            state.error.as_deref(),
            Some("Failed to connect realtime session: handshake refused")
        );
        assert!(!state.listening);
    }

    #[tokio::test]
    async fn test_retry_after_error() {
        let mut tokens = MockTokenSource::new();
        let mut calls = 0;
        tokens.expect_fetch_token().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(TokenError::Rejected("try again".into()))
            } else {
                Ok(SessionCredential::new("second"))
            }
        });
        let controller = VoiceController::new(
            tokens,
            FakeFactory::with(vec![session_expecting("second", 1)]),
        );

        assert!(controller.connect().await.is_err());
        assert_eq!(controller.state().status, ConnectionStatus::Error);

        controller.connect().await.unwrap();
        assert_eq!(controller.state().status, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_disconnect_closes_exactly_once() {
        let controller = VoiceController::new(
            tokens_returning("abc123"),
            FakeFactory::with(vec![session_expecting("abc123", 1)]),
        );
        controller.connect().await.unwrap();

        controller.disconnect().await;
        controller.disconnect().await;

        let state = controller.state();
        assert_eq!(state.status, ConnectionStatus::Idle);
        assert!(!state.listening);
    }

    #[tokio::test]
    async fn test_disconnect_without_session_is_idle() {
        let controller = VoiceController::new(MockTokenSource::new(), FakeFactory::empty());

        controller.disconnect().await;

        assert_eq!(controller.state(), ControllerState::idle());
    }

    #[tokio::test]
    async fn test_teardown_swallows_close_error() {
        let mut session = MockRealtimeSession::new();
        session.expect_connect().times(1).returning(|_| Ok(()));
        session
            .expect_close()
            .times(1)
            .returning(|| Err(SessionError::Closed));
        let controller = VoiceController::new(
            tokens_returning("abc123"),
            FakeFactory::with(vec![session]),
        );
        controller.connect().await.unwrap();
        let rx = controller.subscribe();

        drop(controller);

        assert_eq!(rx.borrow().status, ConnectionStatus::Idle);
    }

    #[tokio::test]
    async fn test_connect_while_connected_is_rejected() {
        let controller = VoiceController::new(
            tokens_returning("abc123"),
            FakeFactory::with(vec![session_expecting("abc123", 1)]),
        );
        controller.connect().await.unwrap();

        let err = controller.connect().await.unwrap_err();
        assert!(matches!(err, ControllerError::AlreadyConnected));
        assert_eq!(controller.state().status, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_overlapping_connect_is_rejected() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(VoiceController::new(
            GatedTokens { gate: gate.clone() },
            FakeFactory::with(vec![session_expecting("late", 1)]),
        ));
        let mut rx = controller.subscribe();

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.connect().await }
        });
        rx.wait_for(|s| s.status == ConnectionStatus::Connecting)
            .await
            .unwrap();

        let err = controller.toggle().await.unwrap_err();
        assert!(matches!(err, ControllerError::Busy));
        assert_eq!(controller.state().status, ConnectionStatus::Connecting);

        gate.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(controller.state().status, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_disconnect_during_connect_discards_late_session() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(VoiceController::new(
            GatedTokens { gate: gate.clone() },
            FakeFactory::with(vec![session_expecting("late", 1)]),
        ));
        let mut rx = controller.subscribe();

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.connect().await }
        });
        rx.wait_for(|s| s.status == ConnectionStatus::Connecting)
            .await
            .unwrap();

        controller.disconnect().await;
        gate.notify_one();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, ControllerError::Superseded));
        let state = controller.state();
        assert_eq!(state.status, ConnectionStatus::Idle);
        assert!(!state.listening);
    }

    #[tokio::test]
    async fn test_dropped_connect_does_not_leave_controller_busy() {
        let gate = Arc::new(Notify::new());
        let controller = VoiceController::new(
            GatedTokens { gate: gate.clone() },
            FakeFactory::with(vec![session_expecting("late", 1)]),
        );

        let timed_out = tokio::time::timeout(Duration::from_millis(50), controller.connect()).await;
        assert!(timed_out.is_err());

        let state = controller.state();
        assert_eq!(state.status, ConnectionStatus::Idle);
        assert!(!state.listening);

        gate.notify_one();
        controller.toggle().await.unwrap();
        assert_eq!(controller.state().status, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_dropped_connect_after_disconnect_keeps_state() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(VoiceController::new(
            GatedTokens { gate: gate.clone() },
            FakeFactory::empty(),
        ));
        let mut rx = controller.subscribe();

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.connect().await }
        });
        rx.wait_for(|s| s.status == ConnectionStatus::Connecting)
            .await
            .unwrap();

        controller.disconnect().await;
        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        assert_eq!(controller.state(), ControllerState::idle());
    }

    #[tokio::test]
    async fn test_toggle_connects_then_disconnects() {
        let controller = VoiceController::new(
            tokens_returning("abc123"),
            FakeFactory::with(vec![session_expecting("abc123", 1)]),
        );

        controller.toggle().await.unwrap();
        assert_eq!(controller.state().status, ConnectionStatus::Connected);

        controller.toggle().await.unwrap();
        assert_eq!(controller.state().status, ConnectionStatus::Idle);
    }
}
