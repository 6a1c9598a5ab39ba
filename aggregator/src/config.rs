use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Enrichment concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Cache TTL must be at least 1 second")]
    InvalidCacheTtl,

    #[error("Max page limit must be at least 1")]
    InvalidPageLimit,

    #[error("Invalid pollution range: min {min} must not exceed max {max}")]
    InvalidPollutionRange { min: f64, max: f64 },

    #[error("Pollution source username and password must be set together")]
    IncompleteCredentials,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Upstream feed of raw pollution records.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct PollutionSourceConfig {
    pub base_url: Url,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "/pollution".into()
}

fn default_source_timeout_secs() -> u64 {
    10
}

/// Page summary API used to describe cities.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct SummariesConfig {
    #[serde(default = "default_summaries_url")]
    pub base_url: Url,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_summary_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummariesConfig {
    fn default() -> Self {
        SummariesConfig {
            base_url: default_summaries_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_summary_timeout_secs(),
        }
    }
}

fn default_summaries_url() -> Url {
    Url::parse("https://en.wikipedia.org/api/rest_v1").expect("valid default url")
}

fn default_user_agent() -> String {
    "polluted-cities-service/1.0".into()
}

fn default_summary_timeout_secs() -> u64 {
    9
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Maximum number of description lookups in flight for one page.
    pub concurrency: usize,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    /// Upper bound for resolving a single item, across all candidate titles.
    pub lookup_timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        EnrichmentConfig {
            concurrency: 5,
            cache_ttl_secs: 3600,
            cache_capacity: 10_000,
            lookup_timeout_secs: 20,
        }
    }
}

/// Inclusive bounds for a plausible pollution value.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq)]
pub struct PollutionRange {
    pub min: f64,
    pub max: f64,
}

impl PollutionRange {
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

impl Default for PollutionRange {
    fn default() -> Self {
        PollutionRange {
            min: 0.0,
            max: 1000.0,
        }
    }
}

fn default_max_page_limit() -> usize {
    100
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    pub pollution_source: PollutionSourceConfig,
    #[serde(default)]
    pub summaries: SummariesConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub pollution_range: PollutionRange,
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: usize,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.listener.port == 0 {
            return Err(ValidationError::InvalidPort);
        }

        if self.enrichment.concurrency == 0 {
            return Err(ValidationError::InvalidConcurrency);
        }

        if self.enrichment.cache_ttl_secs == 0 {
            return Err(ValidationError::InvalidCacheTtl);
        }

        if self.max_page_limit == 0 {
            return Err(ValidationError::InvalidPageLimit);
        }

        let range = self.pollution_range;
        if !(range.min.is_finite() && range.max.is_finite() && range.min <= range.max) {
            return Err(ValidationError::InvalidPollutionRange {
                min: range.min,
                max: range.max,
            });
        }

        let source = &self.pollution_source;
        if source.username.is_some() != source.password.is_some() {
            return Err(ValidationError::IncompleteCredentials);
        }

        Ok(())
    }
}
