use barkeep_core::{
    domain::event::UpcomingEvent,
    schedule::{self, EventQuery},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AttachmentField>,
}

/// A message posted through the Web API, optionally carrying attachments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RichMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

pub struct MessageBuilder {
    text: String,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), attachments: Vec::new() }
    }

    pub fn attachment<F>(mut self, title: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut AttachmentBuilder),
    {
        let mut builder = AttachmentBuilder::default();
        build(&mut builder);
        self.attachments.push(builder.build(title.into()));
        self
    }

    pub fn build(self) -> RichMessage {
        RichMessage { text: self.text, attachments: self.attachments }
    }
}

#[derive(Default)]
pub struct AttachmentBuilder {
    image_url: Option<String>,
    title_link: Option<String>,
    text: String,
    fields: Vec<AttachmentField>,
}

impl AttachmentBuilder {
    pub fn image(&mut self, url: impl Into<String>) -> &mut Self {
        let url = url.into();
        self.image_url = (!url.is_empty()).then_some(url);
        self
    }

    pub fn link(&mut self, url: impl Into<String>) -> &mut Self {
        self.title_link = Some(url.into());
        self
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    pub fn field(&mut self, title: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push_field(title.into(), value.into(), false)
    }

    pub fn short_field(&mut self, title: impl Into<String>, value: impl ToString) -> &mut Self {
        self.push_field(title.into(), value.to_string(), true)
    }

    fn push_field(&mut self, title: String, value: String, short: bool) -> &mut Self {
        self.fields.push(AttachmentField { title, value, short });
        self
    }

    fn build(self, title: String) -> Attachment {
        Attachment {
            image_url: self.image_url,
            title,
            title_link: self.title_link,
            text: self.text,
            fields: self.fields,
        }
    }
}

pub fn next_event_message(
    event: Option<&UpcomingEvent>,
    query: EventQuery,
    now: DateTime<Utc>,
) -> RichMessage {
    let Some(event) = event else {
        return MessageBuilder::new(schedule::not_found_message(query)).build();
    };

    MessageBuilder::new(schedule::announcement(event, query, now))
        .attachment(event.name.clone(), |attachment| {
            attachment
                .image(event.cover.source.clone())
                .link(event.public_url())
                .text(event.description.clone())
                .field("When", schedule::display_date(event))
                .field("Where", event.place.name.clone())
                .short_field("Going", event.attending_count)
                .short_field("Interested", event.interested_count)
                .short_field("Declined", event.declined_count)
                .short_field("Not Replied", event.no_reply_count);
        })
        .build()
}

pub fn error_text(error: &impl std::fmt::Display) -> String {
    format!("An error occurred: {error}")
}
