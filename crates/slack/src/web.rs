use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    blocks::{Attachment, RichMessage},
    events::BotIdentity,
    socket::TransportError,
};

/// `ok: false` error codes that mean the bot token itself is unusable.
pub const AUTH_ERROR_CODES: &[&str] =
    &["invalid_auth", "not_authed", "account_inactive", "token_revoked"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtmSession {
    pub url: String,
    pub identity: BotIdentity,
}

/// Minimal Slack Web API client covering RTM login and posting as the bot.
#[derive(Clone)]
pub struct SlackWebClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl SlackWebClient {
    pub fn new(client: Client, base_url: impl Into<String>, token: SecretString) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url, token }
    }

    pub async fn rtm_connect(&self) -> Result<RtmSession, TransportError> {
        let payload = self.call("rtm.connect", None).await.map_err(TransportError::Connect)?;
        parse_rtm_connect(payload)
    }

    pub async fn post_message(
        &self,
        channel: &str,
        message: &RichMessage,
    ) -> Result<(), TransportError> {
        let body = serde_json::to_value(PostMessage {
            channel,
            as_user: true,
            text: &message.text,
            attachments: &message.attachments,
        })
        .map_err(|error| TransportError::Send(error.to_string()))?;

        let payload = self.call("chat.postMessage", Some(body)).await.map_err(TransportError::Send)?;
        check_ok("chat.postMessage", &payload).map_err(|code| {
            if AUTH_ERROR_CODES.contains(&code.as_str()) {
                TransportError::InvalidAuth(code)
            } else {
                TransportError::Send(format!("chat.postMessage failed: {code}"))
            }
        })
    }

    async fn call(&self, method: &str, body: Option<Value>) -> Result<Value, String> {
        let url = format!("{}/{method}", self.base_url);
        debug!(event_name = "slack.web.request", method, "calling slack web api");

        let request = self.client.post(&url).bearer_auth(self.token.expose_secret());
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };
        let response = request.send().await.map_err(|error| format!("{method}: {error}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{method} returned HTTP {status}"));
        }
        response.json::<Value>().await.map_err(|error| format!("{method} response: {error}"))
    }
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    as_user: bool,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: &'a Vec<Attachment>,
}

#[derive(Deserialize)]
struct RtmConnectResponse {
    url: String,
    #[serde(rename = "self")]
    identity: BotIdentity,
}

pub fn parse_rtm_connect(payload: Value) -> Result<RtmSession, TransportError> {
    if let Err(code) = check_ok("rtm.connect", &payload) {
        return Err(if AUTH_ERROR_CODES.contains(&code.as_str()) {
            TransportError::InvalidAuth(code)
        } else {
            TransportError::Connect(format!("rtm.connect failed: {code}"))
        });
    }

    let response: RtmConnectResponse = serde_json::from_value(payload)
        .map_err(|error| TransportError::Connect(format!("rtm.connect response: {error}")))?;
    Ok(RtmSession { url: response.url, identity: response.identity })
}

/// Returns the `error` code when the envelope reports `ok: false`.
fn check_ok(method: &str, payload: &Value) -> Result<(), String> {
    if payload.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let code = payload.get("error").and_then(Value::as_str).unwrap_or("unknown_error");
    debug!(event_name = "slack.web.not_ok", method, code, "slack web api returned an error");
    Err(code.to_owned())
}
