use serde::Deserialize;
use serde_json::Value;

/// Authenticated identity of the bot user on the workspace.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    pub name: String,
}

impl BotIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }

    /// Prefixes that mark a message as addressed to the bot, in match order.
    pub fn address_prefixes(&self) -> [String; 3] {
        [format!("{} ", self.name), format!("@{} ", self.name), format!("<@{}> ", self.id)]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub channel: String,
    pub user: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RtmEvent {
    Message(IncomingMessage),
    ConnectionError(String),
    InvalidAuth,
    Other { event_type: String },
}

impl RtmEvent {
    pub fn event_type(&self) -> RtmEventType {
        match self {
            Self::Message(_) => RtmEventType::Message,
            Self::ConnectionError(_) => RtmEventType::ConnectionError,
            Self::InvalidAuth => RtmEventType::InvalidAuth,
            Self::Other { .. } => RtmEventType::Other,
        }
    }

    /// Classifies one RTM websocket frame.
    pub fn from_frame(frame: &str) -> Self {
        let value: Value = match serde_json::from_str(frame) {
            Ok(value) => value,
            Err(error) => return Self::ConnectionError(format!("malformed frame: {error}")),
        };

        let event_type = value.get("type").and_then(Value::as_str);
        match event_type {
            Some("message") if carries_user_text(&value) => {
                match serde_json::from_value::<MessageFrame>(value) {
                    Ok(frame) => Self::Message(IncomingMessage {
                        channel: frame.channel,
                        user: frame.user,
                        text: frame.text,
                    }),
                    Err(error) => Self::ConnectionError(format!("malformed message frame: {error}")),
                }
            }
            Some("error") => {
                let message = value
                    .pointer("/error/msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown rtm error")
                    .to_owned();
                Self::ConnectionError(message)
            }
            Some(other) => Self::Other { event_type: other.to_owned() },
            None if value.get("reply_to").is_some() => Self::Other { event_type: "reply".to_owned() },
            None => Self::Other { event_type: "unknown".to_owned() },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RtmEventType {
    Message,
    ConnectionError,
    InvalidAuth,
    Other,
}

/// Message subtypes that still carry text typed by a user.
const USER_TEXT_SUBTYPES: [&str; 2] = ["me_message", "thread_broadcast"];

fn carries_user_text(frame: &Value) -> bool {
    match frame.get("subtype") {
        None => true,
        Some(subtype) => {
            subtype.as_str().is_some_and(|subtype| USER_TEXT_SUBTYPES.contains(&subtype))
        }
    }
}

#[derive(Deserialize)]
struct MessageFrame {
    channel: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
}

/// Returns the text after the bot's address prefix, or `None` when the message
/// is not addressed to the bot.
pub fn addressed_text<'a>(identity: &BotIdentity, text: &'a str) -> Option<&'a str> {
    identity.address_prefixes().iter().find_map(|prefix| text.strip_prefix(prefix.as_str()))
}
