use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::DEFAULT_BAR_NIGHT_COST;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub finance: FinanceConfig,
    pub events: EventsConfig,
    pub http: HttpConfig,
    pub bot: BotConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct FinanceConfig {
    pub api_key: SecretString,
    pub centre: String,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct EventsConfig {
    pub app_id: String,
    pub app_secret: SecretString,
    pub page_name: String,
    pub graph_base_url: String,
}

impl EventsConfig {
    /// Graph API app access token, `<app id>|<app secret>`.
    pub fn access_token(&self) -> SecretString {
        format!("{}|{}", self.app_id, self.app_secret.expose_secret()).into()
    }
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub bar_night_cost: Decimal,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub slack_bot_token: Option<String>,
    pub finance_api_key: Option<String>,
    pub finance_centre: Option<String>,
    pub events_app_id: Option<String>,
    pub events_app_secret: Option<String>,
    pub events_page_name: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                bot_token: String::new().into(),
                api_base_url: "https://slack.com/api".to_string(),
            },
            finance: FinanceConfig {
                api_key: String::new().into(),
                centre: "605".to_string(),
                base_url: "https://eactivities.union.ic.ac.uk/API".to_string(),
            },
            events: EventsConfig {
                app_id: String::new(),
                app_secret: String::new().into(),
                page_name: String::new(),
                graph_base_url: "https://graph.facebook.com/v2.8".to_string(),
            },
            http: HttpConfig { timeout_secs: 30 },
            bot: BotConfig { bar_night_cost: DEFAULT_BAR_NIGHT_COST },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("barkeep.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(bot_token) = slack.bot_token {
                self.slack.bot_token = secret_value(bot_token);
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
        }

        if let Some(finance) = patch.finance {
            if let Some(api_key) = finance.api_key {
                self.finance.api_key = secret_value(api_key);
            }
            if let Some(centre) = finance.centre {
                self.finance.centre = centre;
            }
            if let Some(base_url) = finance.base_url {
                self.finance.base_url = base_url;
            }
        }

        if let Some(events) = patch.events {
            if let Some(app_id) = events.app_id {
                self.events.app_id = app_id;
            }
            if let Some(app_secret) = events.app_secret {
                self.events.app_secret = secret_value(app_secret);
            }
            if let Some(page_name) = events.page_name {
                self.events.page_name = page_name;
            }
            if let Some(graph_base_url) = events.graph_base_url {
                self.events.graph_base_url = graph_base_url;
            }
        }

        if let Some(http) = patch.http {
            if let Some(timeout_secs) = http.timeout_secs {
                self.http.timeout_secs = timeout_secs;
            }
        }

        if let Some(bot) = patch.bot {
            if let Some(bar_night_cost) = bot.bar_night_cost {
                self.bot.bar_night_cost = bar_night_cost;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BARKEEP_SLACK_BOT_TOKEN") {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("BARKEEP_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }

        if let Some(value) = read_env("BARKEEP_FINANCE_API_KEY") {
            self.finance.api_key = secret_value(value);
        }
        if let Some(value) = read_env("BARKEEP_FINANCE_CENTRE") {
            self.finance.centre = value;
        }
        if let Some(value) = read_env("BARKEEP_FINANCE_BASE_URL") {
            self.finance.base_url = value;
        }

        if let Some(value) = read_env("BARKEEP_EVENTS_APP_ID") {
            self.events.app_id = value;
        }
        if let Some(value) = read_env("BARKEEP_EVENTS_APP_SECRET") {
            self.events.app_secret = secret_value(value);
        }
        if let Some(value) = read_env("BARKEEP_EVENTS_PAGE_NAME") {
            self.events.page_name = value;
        }
        if let Some(value) = read_env("BARKEEP_EVENTS_GRAPH_BASE_URL") {
            self.events.graph_base_url = value;
        }

        if let Some(value) = read_env("BARKEEP_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_u64("BARKEEP_HTTP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BARKEEP_BOT_BAR_NIGHT_COST") {
            self.bot.bar_night_cost = parse_decimal("BARKEEP_BOT_BAR_NIGHT_COST", &value)?;
        }

        if let Some(value) = read_env("BARKEEP_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BARKEEP_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("BARKEEP_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        let log_level = read_env("BARKEEP_LOGGING_LEVEL").or_else(|| read_env("BARKEEP_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BARKEEP_LOGGING_FORMAT").or_else(|| read_env("BARKEEP_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(bot_token);
        }
        if let Some(api_key) = overrides.finance_api_key {
            self.finance.api_key = secret_value(api_key);
        }
        if let Some(centre) = overrides.finance_centre {
            self.finance.centre = centre;
        }
        if let Some(app_id) = overrides.events_app_id {
            self.events.app_id = app_id;
        }
        if let Some(app_secret) = overrides.events_app_secret {
            self.events.app_secret = secret_value(app_secret);
        }
        if let Some(page_name) = overrides.events_page_name {
            self.events.page_name = page_name;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_finance(&self.finance)?;
        validate_events(&self.events)?;
        validate_http(&self.http)?;
        validate_bot(&self.bot)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("barkeep.toml"), PathBuf::from("config/barkeep.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn require(value: &str, key: &str, hint: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{key} is required. {hint}")));
    }
    Ok(())
}

fn validate_url(value: &str, key: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let bot_token = slack.bot_token.expose_secret();
    require(
        bot_token,
        "slack.bot_token",
        "Set --slack-token or BARKEEP_SLACK_BOT_TOKEN to the app's Bot User OAuth Token",
    )?;
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used an app-level token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}"
        )));
    }
    validate_url(&slack.api_base_url, "slack.api_base_url")
}

fn validate_finance(finance: &FinanceConfig) -> Result<(), ConfigError> {
    require(
        finance.api_key.expose_secret(),
        "finance.api_key",
        "Set --eactivities-api-key or BARKEEP_FINANCE_API_KEY",
    )?;
    require(
        &finance.centre,
        "finance.centre",
        "Set --eactivities-centre or BARKEEP_FINANCE_CENTRE to the club centre number",
    )?;
    validate_url(&finance.base_url, "finance.base_url")
}

fn validate_events(events: &EventsConfig) -> Result<(), ConfigError> {
    require(&events.app_id, "events.app_id", "Set --facebook-app-id or BARKEEP_EVENTS_APP_ID")?;
    require(
        events.app_secret.expose_secret(),
        "events.app_secret",
        "Set --facebook-app-secret or BARKEEP_EVENTS_APP_SECRET",
    )?;
    require(
        &events.page_name,
        "events.page_name",
        "Set --facebook-page-name or BARKEEP_EVENTS_PAGE_NAME",
    )?;
    validate_url(&events.graph_base_url, "events.graph_base_url")
}

fn validate_http(http: &HttpConfig) -> Result<(), ConfigError> {
    if http.timeout_secs == 0 || http.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "http.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_bot(bot: &BotConfig) -> Result<(), ConfigError> {
    if bot.bar_night_cost.trunc() <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "bot.bar_night_cost must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    finance: Option<FinancePatch>,
    events: Option<EventsPatch>,
    http: Option<HttpPatch>,
    bot: Option<BotPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FinancePatch {
    api_key: Option<String>,
    centre: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EventsPatch {
    app_id: Option<String>,
    app_secret: Option<String>,
    page_name: Option<String>,
    graph_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpPatch {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BotPatch {
    bar_night_cost: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
