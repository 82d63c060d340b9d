mod bootstrap;
mod eactivities;
mod facebook;
mod health;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use barkeep_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use clap::{CommandFactory, Parser};

/// Slack bot answering club membership, finance and event questions.
#[derive(Debug, Parser)]
#[command(name = "barkeep", version)]
struct Args {
    /// Slack bot user OAuth token (xoxb-...)
    #[arg(long = "slack-token")]
    slack_token: Option<String>,
    /// eActivities API key
    #[arg(long = "eactivities-api-key")]
    eactivities_api_key: Option<String>,
    /// eActivities centre number of the club
    #[arg(long = "eactivities-centre")]
    eactivities_centre: Option<String>,
    /// Facebook app id used for the Graph API access token
    #[arg(long = "facebook-app-id")]
    facebook_app_id: Option<String>,
    /// Facebook app secret used for the Graph API access token
    #[arg(long = "facebook-app-secret")]
    facebook_app_secret: Option<String>,
    /// Facebook page whose events are announced
    #[arg(long = "facebook-page-name")]
    facebook_page_name: Option<String>,
    /// Path to barkeep.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn load_options(self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config,
            overrides: ConfigOverrides {
                slack_bot_token: self.slack_token,
                finance_api_key: self.eactivities_api_key,
                finance_centre: self.eactivities_centre,
                events_app_id: self.facebook_app_id,
                events_app_secret: self.facebook_app_secret,
                events_page_name: self.facebook_page_name,
                log_level: None,
            },
        }
    }
}

fn init_logging(config: &AppConfig) {
    use barkeep_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load(Args::parse().load_options()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}\n");
            eprintln!("{}", Args::command().render_usage());
            return ExitCode::from(2);
        }
    };
    init_logging(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(event_name = "system.server.failed", error = %format!("{error:#}"), "barkeep stopped");
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<()> {
    let app = bootstrap::bootstrap_with_config(config)?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.runner.subscribe(),
    )
    .await
    .context("health endpoint could not bind")?;

    tracing::info!(event_name = "system.server.started", "barkeep started");
    tokio::select! {
        outcome = app.runner.run() => {
            outcome.context("chat session ended")?;
            tracing::info!(event_name = "system.server.stream_closed", "chat stream closed");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!(event_name = "system.server.stopping", "barkeep stopping");
        }
    }

    Ok(())
}
