use crate::config::SummariesConfig;
use crate::metrics_defs::DESCRIPTION_LOOKUP_FAILED;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use shared::counter;
use std::time::Duration;
use url::Url;

/// Outcome of looking up a single page title.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub description: Option<String>,
    /// The title resolved to a disambiguation page.
    pub is_ambiguous: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("invalid summary URL: {0}")]
    InvalidUrl(String),
    #[error("summary lookup returned status {0}")]
    Status(StatusCode),
}

/// Fetches a short description for a page title.
#[async_trait]
pub trait SummaryLookup: Send + Sync {
    async fn lookup(&self, title: &str) -> Result<Summary, LookupError>;
}

/// Titles tried for a city, most specific first.
pub fn candidate_titles(name: &str, region: &str) -> [String; 2] {
    [format!("{name}, {region}"), name.to_string()]
}

/// Returns the first usable description among the candidate titles of a city.
/// Failed, ambiguous and empty lookups fall through to the next candidate.
pub async fn resolve_description(
    lookup: &dyn SummaryLookup,
    name: &str,
    region: &str,
) -> Option<String> {
    for title in candidate_titles(name, region) {
        match lookup.lookup(&title).await {
            Ok(summary) if summary.is_ambiguous => {
                tracing::debug!(title = %title, "Skipping disambiguation page");
            }
            Ok(Summary {
                description: Some(text),
                ..
            }) if !text.is_empty() => return Some(text),
            Ok(_) => {}
            Err(LookupError::Status(StatusCode::NOT_FOUND)) => {
                tracing::debug!(title = %title, "No summary page");
            }
            Err(e) => {
                counter!(DESCRIPTION_LOOKUP_FAILED).increment(1);
                tracing::warn!(title = %title, error = %e, "Summary lookup failed");
            }
        }
    }

    None
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(rename = "type")]
    kind: Option<String>,
    extract: Option<String>,
    description: Option<String>,
}

/// Client for a REST page summary API (`{base_url}/page/summary/{title}`).
#[derive(Clone)]
pub struct SummaryClient {
    client: reqwest::Client,
    base_url: Url,
}

impl SummaryClient {
    pub fn new(config: &SummariesConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(SummaryClient {
            client,
            base_url: config.base_url.clone(),
        })
    }

    // The title is percent-encoded as a single path segment.
    fn summary_url(&self, title: &str) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["page", "summary", title]);
        Ok(url)
    }
}

#[async_trait]
impl SummaryLookup for SummaryClient {
    async fn lookup(&self, title: &str) -> Result<Summary, LookupError> {
        let url = self.summary_url(title)?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }

        let body = response.json::<SummaryResponse>().await?;
        let non_empty = |text: &String| !text.trim().is_empty();

        Ok(Summary {
            is_ambiguous: body.kind.as_deref() == Some("disambiguation"),
            description: body
                .extract
                .filter(non_empty)
                .or_else(|| body.description.filter(non_empty)),
        })
    }
}
