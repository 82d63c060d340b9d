//! Slack RTM websocket transport.
//!
//! Login goes through `rtm.connect`; frames are then read from the returned
//! websocket. Plain replies and typing indicators are written to the socket,
//! rich messages are posted through the Web API. A dropped socket is
//! re-established on the next read, each failed attempt surfacing as a
//! `ConnectionError` event until the reconnect policy is exhausted.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde_json::json;
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, trace, warn};

use crate::{
    blocks::RichMessage,
    events::{BotIdentity, RtmEvent},
    socket::{ChatTransport, ReconnectPolicy, TransportError},
    web::SlackWebClient,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

struct ReadState {
    source: Option<WsSource>,
    failures: u32,
}

pub struct RtmTransport {
    web: SlackWebClient,
    policy: ReconnectPolicy,
    reader: Mutex<ReadState>,
    writer: Mutex<Option<WsSink>>,
    next_id: AtomicU64,
}

enum Frame {
    Event(RtmEvent),
    Skip,
    Dropped(String),
}

impl RtmTransport {
    pub fn new(web: SlackWebClient, policy: ReconnectPolicy) -> Self {
        Self {
            web,
            policy,
            reader: Mutex::new(ReadState { source: None, failures: 0 }),
            writer: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    async fn open_socket(&self, url: &str) -> Result<WsSource, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|error| TransportError::Connect(format!("websocket handshake: {error}")))?;
        let (sink, source) = stream.split();
        *self.writer.lock().await = Some(sink);
        Ok(source)
    }

    async fn login(&self) -> Result<(BotIdentity, WsSource), TransportError> {
        let session = self.web.rtm_connect().await?;
        let source = self.open_socket(&session.url).await?;
        Ok((session.identity, source))
    }

    async fn reconnect(&self, state: &mut ReadState) -> Result<Option<RtmEvent>, TransportError> {
        if state.failures >= self.policy.max_retries {
            return Err(TransportError::Receive(format!(
                "gave up reconnecting after {} attempts",
                state.failures
            )));
        }

        let delay = self.policy.backoff(state.failures);
        warn!(
            event_name = "slack.rtm.reconnecting",
            attempt = state.failures + 1,
            delay_ms = delay.as_millis() as u64,
            "reconnecting to slack rtm"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.login().await {
            Ok((identity, source)) => {
                info!(event_name = "slack.rtm.reconnected", bot_id = %identity.id, "reconnected to slack rtm");
                state.source = Some(source);
                state.failures = 0;
                Ok(None)
            }
            Err(TransportError::InvalidAuth(reason)) => {
                warn!(event_name = "slack.rtm.invalid_auth", reason = %reason, "token rejected on reconnect");
                Ok(Some(RtmEvent::InvalidAuth))
            }
            Err(error) => {
                state.failures += 1;
                Ok(Some(RtmEvent::ConnectionError(error.to_string())))
            }
        }
    }

    async fn classify(&self, message: Option<Result<Message, WsError>>) -> Frame {
        match message {
            Some(Ok(Message::Text(text))) => {
                trace!(event_name = "slack.rtm.frame", len = text.len(), "received rtm frame");
                Frame::Event(RtmEvent::from_frame(text.as_str()))
            }
            Some(Ok(Message::Ping(data))) => {
                if let Some(sink) = self.writer.lock().await.as_mut() {
                    if let Err(error) = sink.send(Message::Pong(data)).await {
                        debug!(event_name = "slack.rtm.pong_failed", error = %error, "failed to answer ping");
                    }
                }
                Frame::Skip
            }
            Some(Ok(Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => Frame::Skip,
            Some(Ok(Message::Close(frame))) => {
                let reason = frame.map(|frame| frame.reason.as_str().to_owned()).unwrap_or_default();
                Frame::Dropped(format!("socket closed by server {reason}").trim_end().to_owned())
            }
            Some(Err(error)) => Frame::Dropped(format!("socket error: {error}")),
            None => Frame::Dropped("socket stream ended".to_owned()),
        }
    }

    async fn send_frame(
        &self,
        kind: &str,
        channel: &str,
        text: Option<&str>,
    ) -> Result<(), TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = outgoing_frame(id, kind, channel, text);

        let mut writer = self.writer.lock().await;
        let sink = writer
            .as_mut()
            .ok_or_else(|| TransportError::Send("socket is not connected".to_owned()))?;
        sink.send(Message::text(frame)).await.map_err(|error| TransportError::Send(error.to_string()))
    }
}

fn outgoing_frame(id: u64, kind: &str, channel: &str, text: Option<&str>) -> String {
    let mut frame = json!({ "id": id, "type": kind, "channel": channel });
    if let Some(text) = text {
        frame["text"] = json!(text);
    }
    frame.to_string()
}

#[async_trait]
impl ChatTransport for RtmTransport {
    async fn connect(&self) -> Result<BotIdentity, TransportError> {
        let (identity, source) = self.login().await?;
        let mut state = self.reader.lock().await;
        state.source = Some(source);
        state.failures = 0;
        Ok(identity)
    }

    async fn next_event(&self) -> Result<Option<RtmEvent>, TransportError> {
        let mut state = self.reader.lock().await;
        loop {
            if state.source.is_none() {
                if let Some(event) = self.reconnect(&mut state).await? {
                    return Ok(Some(event));
                }
            }

            let message = match state.source.as_mut() {
                Some(source) => source.next().await,
                None => continue,
            };
            match self.classify(message).await {
                Frame::Event(event) => return Ok(Some(event)),
                Frame::Skip => continue,
                Frame::Dropped(reason) => {
                    warn!(event_name = "slack.rtm.disconnected", reason = %reason, "slack rtm socket dropped");
                    state.source = None;
                    self.writer.lock().await.take();
                    return Ok(Some(RtmEvent::ConnectionError(reason)));
                }
            }
        }
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        self.send_frame("message", channel, Some(text)).await
    }

    async fn send_rich_message(
        &self,
        channel: &str,
        message: &RichMessage,
    ) -> Result<(), TransportError> {
        self.web.post_message(channel, message).await
    }

    async fn send_typing(&self, channel: &str) -> Result<(), TransportError> {
        self.send_frame("typing", channel, None).await
    }
}

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use secrecy::SecretString;
    use serde_json::Value;
    use tokio::{net::TcpListener, sync::oneshot};
    use tokio_tungstenite::{accept_async, tungstenite::Message};

    use super::{outgoing_frame, RtmTransport};
    use crate::{
        events::{IncomingMessage, RtmEvent},
        socket::{ChatTransport, ReconnectPolicy, TransportError},
        web::SlackWebClient,
    };

    fn transport(max_retries: u32) -> RtmTransport {
        let web = SlackWebClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/api",
            SecretString::from("xoxb-test"),
        );
        RtmTransport::new(web, ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 })
    }

    #[test]
    fn typing_frames_have_no_text() {
        let frame: Value = serde_json::from_str(&outgoing_frame(7, "typing", "C1", None))
            .expect("frame should be json");
        assert_eq!(frame, serde_json::json!({"id": 7, "type": "typing", "channel": "C1"}));
    }

    #[tokio::test]
    async fn reads_frames_writes_replies_and_reports_drops() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let url = format!("ws://{}", listener.local_addr().expect("local addr"));
        let (received_tx, received_rx) = oneshot::channel();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut socket = accept_async(stream).await.expect("handshake");
            socket.send(Message::text(r#"{"type":"hello"}"#)).await.expect("send hello");
            socket
                .send(Message::text(
                    r#"{"type":"message","channel":"C1","user":"U1","text":"barkeep bevs"}"#,
                ))
                .await
                .expect("send message");

            while let Some(Ok(message)) = socket.next().await {
                if let Message::Text(text) = message {
                    let _ = received_tx.send(text.to_string());
                    break;
                }
            }
            socket.close(None).await.expect("close");
        });

        let transport = transport(0);
        let source = transport.open_socket(&url).await.expect("socket should open");
        transport.reader.lock().await.source = Some(source);

        assert_eq!(
            transport.next_event().await.expect("hello"),
            Some(RtmEvent::Other { event_type: "hello".to_owned() })
        );
        assert_eq!(
            transport.next_event().await.expect("message"),
            Some(RtmEvent::Message(IncomingMessage {
                channel: "C1".to_owned(),
                user: "U1".to_owned(),
                text: "barkeep bevs".to_owned(),
            }))
        );

        transport.send_message("C1", "We have *3* members.").await.expect("reply sent");
        let frame: Value =
            serde_json::from_str(&received_rx.await.expect("server saw frame")).expect("json");
        assert_eq!(frame["type"], "message");
        assert_eq!(frame["channel"], "C1");
        assert_eq!(frame["text"], "We have *3* members.");
        assert_eq!(frame["id"], 1);

        let dropped = transport.next_event().await.expect("drop is an event");
        assert!(matches!(dropped, Some(RtmEvent::ConnectionError(_))));

        let exhausted = transport.next_event().await;
        assert!(matches!(exhausted, Err(TransportError::Receive(_))));
        assert!(matches!(transport.send_typing("C1").await, Err(TransportError::Send(_))));

        server.await.expect("server task");
    }

    #[tokio::test]
    async fn failed_reconnects_surface_as_connection_errors() {
        let transport = transport(2);

        for _ in 0..2 {
            let event = transport.next_event().await.expect("attempt is reported");
            assert!(matches!(event, Some(RtmEvent::ConnectionError(_))));
        }
        assert!(matches!(transport.next_event().await, Err(TransportError::Receive(_))));
    }
}
