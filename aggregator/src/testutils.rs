use crate::pollution_source::{PollutionSource, SourceError, SourceQuery};
use crate::record::RawRecord;
use crate::summaries::{LookupError, Summary, SummaryLookup};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub enum StubResponse {
    Description(&'static str),
    Ambiguous,
    Fail,
}

/// Scripted summary lookup that records every title it is asked for and the
/// highest number of lookups it saw in flight at once. Unscripted titles
/// resolve to an empty summary.
#[derive(Default)]
pub struct StubLookup {
    responses: HashMap<String, StubResponse>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    titles: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, title: &str, response: StubResponse) -> Self {
        self.responses.insert(title.to_string(), response);
        self
    }

    pub fn delay(mut self, title: &str, delay: Duration) -> Self {
        self.delays.insert(title.to_string(), delay);
        self
    }

    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.titles.lock().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryLookup for StubLookup {
    async fn lookup(&self, title: &str) -> Result<Summary, LookupError> {
        self.titles.lock().push(title.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self
            .delays
            .get(title)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(title) {
            Some(StubResponse::Description(text)) => Ok(Summary {
                description: Some(text.to_string()),
                is_ambiguous: false,
            }),
            Some(StubResponse::Ambiguous) => Ok(Summary {
                description: Some(format!("{title} may refer to:")),
                is_ambiguous: true,
            }),
            Some(StubResponse::Fail) => Err(LookupError::Status(StatusCode::INTERNAL_SERVER_ERROR)),
            None => Ok(Summary::default()),
        }
    }
}

/// Pollution source returning a fixed set of records, or failing every fetch.
pub struct StubSource {
    records: Option<Vec<RawRecord>>,
    queries: Mutex<Vec<SourceQuery>>,
}

impl StubSource {
    pub fn with_records(values: Vec<serde_json::Value>) -> Self {
        let records = values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();

        StubSource {
            records: Some(records),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        StubSource {
            records: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<SourceQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl PollutionSource for StubSource {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawRecord>, SourceError> {
        self.queries.lock().push(query.clone());
        self.records
            .clone()
            .ok_or(SourceError::Status(StatusCode::SERVICE_UNAVAILABLE))
    }
}
