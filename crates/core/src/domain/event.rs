use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::DomainError;

/// Graph API timestamps look like `2017-02-14T19:00:00+0000`.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EventTime(DateTime<FixedOffset>);

impl EventTime {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl FromStr for EventTime {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // chrono's %z also accepts `+01:00`; only the compact offset is valid here.
        let offset = value.get(19..).unwrap_or_default();
        let compact_offset = offset.len() == 5
            && matches!(offset.as_bytes()[0], b'+' | b'-')
            && offset.as_bytes()[1..].iter().all(u8::is_ascii_digit);
        if !compact_offset {
            return Err(DomainError::InvalidEventTime(value.to_owned()));
        }

        DateTime::parse_from_str(value, EVENT_TIME_FORMAT)
            .map(Self)
            .map_err(|_| DomainError::InvalidEventTime(value.to_owned()))
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCover {
    #[serde(default)]
    pub source: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPlace {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub id: String,
    pub name: String,
    pub start_time: EventTime,
    #[serde(default)]
    pub end_time: Option<EventTime>,
    #[serde(default)]
    pub cover: EventCover,
    #[serde(default)]
    pub place: EventPlace,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attending_count: u32,
    #[serde(default)]
    pub interested_count: u32,
    #[serde(default)]
    pub maybe_count: u32,
    #[serde(default, rename = "noreply_count")]
    pub no_reply_count: u32,
    #[serde(default)]
    pub declined_count: u32,
}

impl UpcomingEvent {
    pub fn public_url(&self) -> String {
        format!("https://www.facebook.com/events/{}/", self.id)
    }
}
