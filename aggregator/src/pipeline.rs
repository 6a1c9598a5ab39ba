use crate::config::{Config, PollutionRange};
use crate::description_cache::DescriptionCache;
use crate::enricher::{EnrichedRecord, Enricher};
use crate::errors::{AggregatorError, Result};
use crate::metrics_defs::{RECORDS_DROPPED, SOURCE_FETCH_DURATION, SOURCE_FETCH_FAILED};
use crate::pollution_source::{PollutionApiClient, PollutionSource, SourceQuery};
use crate::ranking::{dedupe, paginate, rank};
use crate::record::{CanonicalRecord, RawRecord, is_valid, normalize};
use crate::summaries::SummaryClient;
use serde::Serialize;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
    pub region: Option<String>,
    /// 1-based.
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PageResponse {
    pub page: usize,
    pub limit: usize,
    /// Number of valid, deduplicated records across all pages.
    pub total: usize,
    pub cities: Vec<EnrichedRecord>,
}

struct CityAggregatorInner {
    source: Arc<dyn PollutionSource>,
    enricher: Enricher,
    pollution_range: PollutionRange,
    max_page_limit: usize,
}

/// Produces ranked, enriched pages of the most polluted cities.
#[derive(Clone)]
pub struct CityAggregator {
    inner: Arc<CityAggregatorInner>,
}

impl CityAggregator {
    pub fn new(
        source: Arc<dyn PollutionSource>,
        enricher: Enricher,
        pollution_range: PollutionRange,
        max_page_limit: usize,
    ) -> Self {
        CityAggregator {
            inner: Arc::new(CityAggregatorInner {
                source,
                enricher,
                pollution_range,
                max_page_limit: max_page_limit.max(1),
            }),
        }
    }

    /// Builds the HTTP-backed pipeline described by the config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = PollutionApiClient::new(&config.pollution_source)
            .map_err(AggregatorError::SourceClient)?;
        let summaries = SummaryClient::new(&config.summaries)?;

        let enrichment = &config.enrichment;
        let cache = DescriptionCache::new(
            Duration::from_secs(enrichment.cache_ttl_secs),
            enrichment.cache_capacity,
        );
        let enricher = Enricher::new(
            Arc::new(summaries),
            cache,
            enrichment.concurrency,
            Duration::from_secs(enrichment.lookup_timeout_secs),
        );

        Ok(CityAggregator::new(
            Arc::new(source),
            enricher,
            config.pollution_range,
            config.max_page_limit,
        ))
    }

    pub fn max_page_limit(&self) -> usize {
        self.inner.max_page_limit
    }

    /// Fetches, cleans, ranks and enriches one page. Fails only when the
    /// pollution source cannot be read; page and limit are clamped to their
    /// valid ranges.
    pub async fn get_page(&self, request: &PageRequest) -> Result<PageResponse> {
        let page = request.page.max(1);
        let limit = request.limit.clamp(1, self.inner.max_page_limit);

        let query = SourceQuery {
            region: request.region.clone(),
            page,
            limit,
        };

        let started = Instant::now();
        let raw = self.inner.source.fetch(&query).await.inspect_err(|e| {
            counter!(SOURCE_FETCH_FAILED).increment(1);
            tracing::error!(error = %e, region = ?query.region, "Failed to fetch pollution data");
        })?;
        histogram!(SOURCE_FETCH_DURATION).record(started.elapsed().as_secs_f64());

        let ranked = rank(dedupe(self.canonicalize(&raw)));
        let (items, total) = paginate(&ranked, page, limit);
        let cities = self.inner.enricher.enrich(items).await;

        Ok(PageResponse {
            page,
            limit,
            total,
            cities,
        })
    }

    /// Normalizes and validates raw records, dropping the ones that fail.
    fn canonicalize(&self, raw: &[RawRecord]) -> Vec<CanonicalRecord> {
        let records: Vec<CanonicalRecord> = raw
            .iter()
            .filter_map(|record| normalize(record))
            .filter(|record| is_valid(record, &self.inner.pollution_range))
            .collect();

        let dropped = raw.len() - records.len();
        if dropped > 0 {
            counter!(RECORDS_DROPPED).increment(dropped as u64);
            tracing::debug!(dropped, kept = records.len(), "Dropped invalid records");
        }

        records
    }
}
