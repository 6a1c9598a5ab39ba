use crate::config::PollutionSourceConfig;
use crate::record::RawRecord;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

/// What the client asked for. Pagination is applied after deduplication, so
/// the page and limit are informational for the source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceQuery {
    pub region: Option<String>,
    pub page: usize,
    pub limit: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("pollution source returned status {0}")]
    Status(StatusCode),
}

/// Upstream feed of raw pollution records.
#[async_trait]
pub trait PollutionSource: Send + Sync {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawRecord>, SourceError>;
}

pub struct PollutionApiClient {
    client: reqwest::Client,
    url: Url,
    credentials: Option<(String, String)>,
}

impl PollutionApiClient {
    pub fn new(config: &PollutionSourceConfig) -> Result<Self, SourceError> {
        let full_url = format!(
            "{}/{}",
            config.base_url.as_str().trim_end_matches('/'),
            config.endpoint.trim_start_matches('/')
        );
        let url = Url::parse(&full_url).map_err(|e| SourceError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Ok(PollutionApiClient {
            client,
            url,
            credentials,
        })
    }
}

#[async_trait]
impl PollutionSource for PollutionApiClient {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawRecord>, SourceError> {
        tracing::debug!(
            region = ?query.region,
            page = query.page,
            limit = query.limit,
            "Fetching pollution records"
        );

        let mut request = self.client.get(self.url.clone());
        if let Some(region) = &query.region {
            request = request.query(&[("country", region)]);
        }
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body = response.json::<Value>().await?;
        Ok(extract_records(body))
    }
}

/// Accepts either `{"data": [...]}` or a bare array. Anything else, and any
/// array entry that is not an object, yields no records.
fn extract_records(body: Value) -> Vec<RawRecord> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect()
}
