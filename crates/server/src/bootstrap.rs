use std::{sync::Arc, time::Duration};

use barkeep_core::{config::AppConfig, money::MoneyFormatter};
use barkeep_slack::{
    ChatTransport, ReconnectPolicy, Responder, RtmTransport, SessionRunner, SlackWebClient,
};
use thiserror::Error;
use tracing::info;

use crate::{eactivities::EActivitiesClient, facebook::GraphEventFeed};

pub struct Application {
    pub config: AppConfig,
    pub runner: SessionRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .user_agent(concat!("barkeep/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(BootstrapError::HttpClient)?;

    let web = SlackWebClient::new(
        http.clone(),
        config.slack.api_base_url.clone(),
        config.slack.bot_token.clone(),
    );
    let transport: Arc<dyn ChatTransport> =
        Arc::new(RtmTransport::new(web, ReconnectPolicy::default()));
    let finance = Arc::new(EActivitiesClient::new(http.clone(), &config.finance));
    let events = Arc::new(GraphEventFeed::new(http, &config.events));

    let responder = Arc::new(Responder::new(
        Arc::clone(&transport),
        finance,
        events,
        MoneyFormatter::new(config.bot.bar_night_cost),
    ));
    let runner = SessionRunner::new(transport, responder);

    info!(
        event_name = "system.bootstrap.ready",
        centre = %config.finance.centre,
        page = %config.events.page_name,
        bar_night_cost = %config.bot.bar_night_cost,
        "collaborators configured"
    );

    Ok(Application { config, runner })
}

#[cfg(test)]
mod tests {
    use barkeep_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use barkeep_slack::SessionState;

    use crate::bootstrap::bootstrap_with_config;

    fn overrides(slack_token: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                slack_bot_token: Some(slack_token.to_owned()),
                finance_api_key: Some("key".to_owned()),
                events_app_id: Some("1234".to_owned()),
                events_app_secret: Some("shh".to_owned()),
                events_page_name: Some("icsmbar".to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[test]
    fn config_fails_fast_on_app_level_token() {
        let error = AppConfig::load(overrides("xapp-1-abc")).expect_err("xapp token is rejected");
        assert!(error.to_string().contains("slack.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_starts_in_connecting_state() {
        let config = AppConfig::load(overrides("xoxb-test")).expect("config should load");

        let app = bootstrap_with_config(config).expect("bootstrap should succeed");

        assert_eq!(app.config.finance.centre, "605");
        assert_eq!(*app.runner.subscribe().borrow(), SessionState::Connecting);
    }
}
