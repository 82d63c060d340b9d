use std::path::Path;

use barkeep_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::CommandResult;

const CREDENTIAL_CHECKS: [&str; 3] =
    ["slack_token_readiness", "eactivities_credentials", "facebook_credentials"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<&Path>, json_output: bool) -> CommandResult {
    let report = build_report(config_path);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::new(exit_code, output);
    }

    CommandResult::new(exit_code, render_human(&report))
}

fn build_report(config_path: Option<&Path>) -> DoctorReport {
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    };

    let checks = match AppConfig::load(options) {
        Ok(config) => vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            check_slack_token(&config),
            check_eactivities(&config),
            check_facebook(&config),
        ],
        Err(error) => std::iter::once(DoctorCheck::fail("config_validation", error.to_string()))
            .chain(CREDENTIAL_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }))
            .collect(),
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_token(config: &AppConfig) -> DoctorCheck {
    let token = config.slack.bot_token.expose_secret();
    if token.chars().any(char::is_whitespace) {
        return DoctorCheck::fail("slack_token_readiness", "bot token contains whitespace");
    }
    DoctorCheck::pass(
        "slack_token_readiness",
        format!("bot token ready for rtm.connect at {}", config.slack.api_base_url),
    )
}

fn check_eactivities(config: &AppConfig) -> DoctorCheck {
    let centre = &config.finance.centre;
    if !centre.chars().all(|ch| ch.is_ascii_digit()) {
        return DoctorCheck::fail(
            "eactivities_credentials",
            format!("centre `{centre}` should be the numeric club centre"),
        );
    }
    DoctorCheck::pass(
        "eactivities_credentials",
        format!("api key present for centre {centre} at {}", config.finance.base_url),
    )
}

fn check_facebook(config: &AppConfig) -> DoctorCheck {
    let app_id = &config.events.app_id;
    if !app_id.chars().all(|ch| ch.is_ascii_digit()) {
        return DoctorCheck::fail(
            "facebook_credentials",
            format!("app id `{app_id}` should be numeric"),
        );
    }
    DoctorCheck::pass(
        "facebook_credentials",
        format!("app access token ready for page `{}`", config.events.page_name),
    )
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
