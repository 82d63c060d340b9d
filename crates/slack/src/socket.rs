use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::{sync::watch, task::JoinSet};
use tracing::{debug, error, info, warn};

use crate::{
    blocks::RichMessage,
    events::{BotIdentity, IncomingMessage, RtmEvent},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("chat credentials were rejected: {0}")]
    InvalidAuth(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Real-time chat connection. Implementations own reconnection; `next_event`
/// returns `Ok(None)` only when the stream has ended for good.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<BotIdentity, TransportError>;
    async fn next_event(&self) -> Result<Option<RtmEvent>, TransportError>;
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), TransportError>;
    async fn send_rich_message(
        &self,
        channel: &str,
        message: &RichMessage,
    ) -> Result<(), TransportError>;
    async fn send_typing(&self, channel: &str) -> Result<(), TransportError>;
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, identity: &BotIdentity, message: IncomingMessage);
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Running { bot_id: String, bot_name: String },
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

pub struct SessionRunner {
    transport: Arc<dyn ChatTransport>,
    handler: Arc<dyn MessageHandler>,
    state: watch::Sender<SessionState>,
}

impl SessionRunner {
    pub fn new(transport: Arc<dyn ChatTransport>, handler: Arc<dyn MessageHandler>) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self { transport, handler, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Connects and pumps events until the stream ends or credentials are
    /// rejected. Addressed messages are handled on their own tasks, which are
    /// awaited when the stream ends and aborted when the session fails.
    pub async fn run(&self) -> Result<(), SessionError> {
        info!(event_name = "session.connecting", "opening chat session");
        let identity = match self.transport.connect().await {
            Ok(identity) => identity,
            Err(TransportError::InvalidAuth(reason)) => {
                error!(event_name = "session.invalid_auth", reason = %reason, "chat credentials rejected");
                return Err(SessionError::InvalidCredentials);
            }
            Err(other) => return Err(other.into()),
        };
        let identity = Arc::new(identity);

        info!(
            event_name = "session.running",
            bot_id = %identity.id,
            bot_name = %identity.name,
            "chat session established"
        );
        self.state.send_replace(SessionState::Running {
            bot_id: identity.id.clone(),
            bot_name: identity.name.clone(),
        });

        let mut tasks = JoinSet::new();
        let outcome = self.pump(&identity, &mut tasks).await;

        if outcome.is_ok() {
            while let Some(joined) = tasks.join_next().await {
                log_task_result(joined);
            }
        } else {
            if !tasks.is_empty() {
                warn!(
                    event_name = "session.handlers_aborted",
                    in_flight = tasks.len(),
                    "aborting in-flight message handlers"
                );
            }
            tasks.abort_all();
        }
        self.state.send_replace(SessionState::Connecting);
        outcome
    }

    async fn pump(
        &self,
        identity: &Arc<BotIdentity>,
        tasks: &mut JoinSet<()>,
    ) -> Result<(), SessionError> {
        loop {
            while let Some(joined) = tasks.try_join_next() {
                log_task_result(joined);
            }

            let Some(event) = self.transport.next_event().await? else {
                info!(event_name = "session.closed", "chat event stream ended");
                return Ok(());
            };

            match event {
                RtmEvent::Message(message) => {
                    debug!(
                        event_name = "session.message_received",
                        channel = %message.channel,
                        user = %message.user,
                        "received chat message"
                    );
                    let handler = Arc::clone(&self.handler);
                    let identity = Arc::clone(identity);
                    tasks.spawn(async move { handler.handle_message(&identity, message).await });
                }
                RtmEvent::ConnectionError(reason) => {
                    warn!(event_name = "session.connection_error", reason = %reason, "chat connection error");
                }
                RtmEvent::InvalidAuth => {
                    error!(event_name = "session.invalid_auth", "chat credentials rejected mid-session");
                    return Err(SessionError::InvalidCredentials);
                }
                RtmEvent::Other { event_type } => {
                    debug!(event_name = "session.event_ignored", event_type = %event_type, "ignoring chat event");
                }
            }
        }
    }
}

fn log_task_result(joined: Result<(), tokio::task::JoinError>) {
    if let Err(join_error) = joined {
        error!(event_name = "session.handler_panicked", error = %join_error, "message handler task failed");
    }
}


#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{
        testing::ScriptedTransport, MessageHandler, ReconnectPolicy, SessionError, SessionRunner,
        SessionState, TransportError,
    };
    use crate::events::{BotIdentity, IncomingMessage, RtmEvent};

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<(String, IncomingMessage)>>,
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle_message(&self, identity: &BotIdentity, message: IncomingMessage) {
            self.seen.lock().await.push((identity.id.clone(), message));
        }
    }

    fn message(text: &str) -> RtmEvent {
        RtmEvent::Message(IncomingMessage {
            channel: "C1".to_owned(),
            user: "U1".to_owned(),
            text: text.to_owned(),
        })
    }

    #[tokio::test]
    async fn dispatches_messages_and_survives_connection_errors() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(Some(message("barkeep bevs"))),
            Ok(Some(RtmEvent::ConnectionError("socket dropped".to_owned()))),
            Ok(Some(RtmEvent::Other { event_type: "hello".to_owned() })),
            Ok(Some(message("barkeep membership"))),
            Ok(None),
        ]));
        let handler = Arc::new(RecordingHandler::default());
        let runner = SessionRunner::new(transport, handler.clone());

        runner.run().await.expect("session should end cleanly");

        let seen = handler.seen.lock().await;
        let mut texts = seen.iter().map(|(_, message)| message.text.as_str()).collect::<Vec<_>>();
        texts.sort_unstable();
        assert_eq!(texts, vec!["barkeep bevs", "barkeep membership"]);
        assert!(seen.iter().all(|(bot_id, _)| bot_id == "UBOT"));
    }

    #[tokio::test]
    async fn rejected_login_is_invalid_credentials() {
        let transport = Arc::new(ScriptedTransport::with_connect(
            Err(TransportError::InvalidAuth("invalid_auth".to_owned())),
            vec![],
        ));
        let runner = SessionRunner::new(transport, Arc::new(RecordingHandler::default()));

        let result = runner.run().await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
        assert_eq!(*runner.subscribe().borrow(), SessionState::Connecting);
    }

    #[tokio::test]
    async fn invalid_auth_event_stops_the_loop() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(Some(RtmEvent::InvalidAuth)),
            Ok(Some(message("barkeep bevs"))),
        ]));
        let handler = Arc::new(RecordingHandler::default());
        let runner = SessionRunner::new(transport, handler.clone());

        assert!(matches!(runner.run().await, Err(SessionError::InvalidCredentials)));
        assert!(handler.seen.lock().await.is_empty());
    }

    struct StalledHandler;

    #[async_trait]
    impl MessageHandler for StalledHandler {
        async fn handle_message(&self, _identity: &BotIdentity, _message: IncomingMessage) {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
    }

    #[tokio::test]
    async fn invalid_auth_does_not_wait_for_in_flight_handlers() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(Some(message("barkeep bevs"))),
            Ok(Some(RtmEvent::InvalidAuth)),
        ]));
        let runner = SessionRunner::new(transport, Arc::new(StalledHandler));

        let result = tokio::time::timeout(Duration::from_secs(2), runner.run())
            .await
            .expect("runner should return without waiting on handlers");

        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
        assert_eq!(*runner.subscribe().borrow(), SessionState::Connecting);
    }

    #[tokio::test]
    async fn transport_failures_propagate() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(TransportError::Receive(
            "retries exhausted".to_owned(),
        ))]));
        let runner = SessionRunner::new(transport, Arc::new(RecordingHandler::default()));

        let result = runner.run().await;
        assert!(matches!(result, Err(SessionError::Transport(TransportError::Receive(_)))));
    }

    #[tokio::test]
    async fn state_falls_back_to_connecting_when_stream_ends() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let runner = SessionRunner::new(transport, Arc::new(RecordingHandler::default()));
        let mut state = runner.subscribe();
        assert_eq!(*state.borrow(), SessionState::Connecting);

        runner.run().await.expect("session should end cleanly");

        assert!(state.has_changed().expect("sender alive"));
        assert_eq!(*state.borrow_and_update(), SessionState::Connecting);
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = ReconnectPolicy { max_retries: 5, base_delay_ms: 100, max_delay_ms: 1_000 };
        let delays = (0..6).map(|attempt| policy.backoff(attempt).as_millis()).collect::<Vec<_>>();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }
}
