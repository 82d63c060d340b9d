use async_trait::async_trait;
use barkeep_core::{
    config::FinanceConfig,
    domain::finance::{Member, OperatingYear, TransactionLine},
    errors::SourceError,
    sources::FinanceSource,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

pub const SOURCE_NAME: &str = "eActivities";
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Reads membership and ledger reports for one club centre.
pub struct EActivitiesClient {
    client: Client,
    base_url: String,
    centre: String,
    api_key: SecretString,
}

impl EActivitiesClient {
    pub fn new(client: Client, config: &FinanceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            centre: config.centre.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn report_url(&self, report: &str) -> String {
        format!("{}/CSP/{}/reports/{report}", self.base_url, self.centre)
    }

    async fn report<T: DeserializeOwned>(
        &self,
        report: &str,
        year: OperatingYear,
    ) -> Result<Vec<T>, SourceError> {
        let url = self.report_url(report);
        debug!(event_name = "eactivities.request", report, year = %year, centre = %self.centre, "fetching report");

        let response = self
            .client
            .get(&url)
            .query(&[("year", year.to_string())])
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .send()
            .await
            .map_err(|error| SourceError::Request { source_name: SOURCE_NAME, message: error.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { source_name: SOURCE_NAME, status: status.as_u16(), body });
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|error| SourceError::Decode { source_name: SOURCE_NAME, message: error.to_string() })
    }
}

#[async_trait]
impl FinanceSource for EActivitiesClient {
    async fn members(&self, year: OperatingYear) -> Result<Vec<Member>, SourceError> {
        self.report("members", year).await
    }

    async fn transaction_lines(
        &self,
        year: OperatingYear,
    ) -> Result<Vec<TransactionLine>, SourceError> {
        self.report("transactionlines", year).await
    }
}
