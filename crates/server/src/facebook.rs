use async_trait::async_trait;
use barkeep_core::{
    config::EventsConfig, domain::event::UpcomingEvent, errors::SourceError, sources::EventFeed,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

pub const SOURCE_NAME: &str = "Facebook";

/// Event fields requested from the page edge.
pub const EVENT_FIELDS: &str = "events{name,category,start_time,end_time,id,cover,place,description,attending_count,interested_count,maybe_count,declined_count,noreply_count}";

pub struct GraphEventFeed {
    client: Client,
    graph_base_url: String,
    page_name: String,
    access_token: SecretString,
}

#[derive(Deserialize)]
struct PageEvents {
    #[serde(default)]
    events: EventPage,
}

#[derive(Default, Deserialize)]
struct EventPage {
    #[serde(default)]
    data: Vec<UpcomingEvent>,
}

impl GraphEventFeed {
    pub fn new(client: Client, config: &EventsConfig) -> Self {
        Self {
            client,
            graph_base_url: config.graph_base_url.trim_end_matches('/').to_owned(),
            page_name: config.page_name.clone(),
            access_token: config.access_token(),
        }
    }
}

#[async_trait]
impl EventFeed for GraphEventFeed {
    async fn upcoming_events(&self) -> Result<Vec<UpcomingEvent>, SourceError> {
        let url = format!("{}/{}", self.graph_base_url, self.page_name);
        debug!(event_name = "facebook.request", page = %self.page_name, "fetching page events");

        let response = self
            .client
            .get(&url)
            .query(&[("fields", EVENT_FIELDS), ("access_token", self.access_token.expose_secret())])
            .send()
            .await
            .map_err(|error| SourceError::Request {
                source_name: SOURCE_NAME,
                message: error.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { source_name: SOURCE_NAME, status: status.as_u16(), body });
        }

        let page = response.json::<PageEvents>().await.map_err(|error| SourceError::Decode {
            source_name: SOURCE_NAME,
            message: error.without_url().to_string(),
        })?;
        Ok(page.events.data)
    }
}
