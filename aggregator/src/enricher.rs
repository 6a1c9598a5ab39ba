//! Adds descriptions to the records of one page.
//!
//! A fixed pool of workers claims item indices from a shared counter, so no
//! more than `concurrency` descriptions are resolved at a time regardless of
//! the page size. Each worker writes into the slot of the index it claimed,
//! which keeps the output in page order whatever the completion order.

use crate::description_cache::{CachedDescription, DescriptionCache};
use crate::metrics_defs::{DESCRIPTION_LOOKUP_TIMEOUT, ENRICHMENT_DURATION};
use crate::record::CanonicalRecord;
use crate::summaries::{SummaryLookup, resolve_description};
use parking_lot::Mutex;
use serde::Serialize;
use shared::{counter, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::timeout;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: CanonicalRecord,
    /// Empty when no description is known.
    pub description: String,
}

#[derive(Clone)]
pub struct Enricher {
    lookup: Arc<dyn SummaryLookup>,
    cache: DescriptionCache,
    concurrency: usize,
    lookup_timeout: Duration,
}

impl Enricher {
    pub fn new(
        lookup: Arc<dyn SummaryLookup>,
        cache: DescriptionCache,
        concurrency: usize,
        lookup_timeout: Duration,
    ) -> Self {
        Enricher {
            lookup,
            cache,
            concurrency: concurrency.max(1),
            lookup_timeout,
        }
    }

    /// Returns one enriched record per input item, in input order. Failed
    /// lookups leave the description empty and never fail the page.
    pub async fn enrich(&self, items: &[CanonicalRecord]) -> Vec<EnrichedRecord> {
        let started = Instant::now();

        let items: Arc<[CanonicalRecord]> = items.into();
        let slots = Arc::new(Mutex::new(vec![None; items.len()]));
        let next_index = Arc::new(AtomicUsize::new(0));

        let mut workers = JoinSet::new();
        for _ in 0..self.concurrency.min(items.len()) {
            let worker = Worker {
                items: items.clone(),
                next_index: next_index.clone(),
                slots: slots.clone(),
                lookup: self.lookup.clone(),
                cache: self.cache.clone(),
                lookup_timeout: self.lookup_timeout,
            };
            workers.spawn(worker.run());
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Enrichment worker panicked: {e}");
            }
        }

        histogram!(ENRICHMENT_DURATION).record(started.elapsed().as_secs_f64());

        let descriptions = std::mem::take(&mut *slots.lock());
        items
            .iter()
            .zip(descriptions)
            .map(|(record, description)| EnrichedRecord {
                record: record.clone(),
                description: description.unwrap_or_default(),
            })
            .collect()
    }
}

struct Worker {
    items: Arc<[CanonicalRecord]>,
    next_index: Arc<AtomicUsize>,
    slots: Arc<Mutex<Vec<Option<String>>>>,
    lookup: Arc<dyn SummaryLookup>,
    cache: DescriptionCache,
    lookup_timeout: Duration,
}

impl Worker {
    async fn run(self) {
        loop {
            let index = self.next_index.fetch_add(1, Ordering::Relaxed);
            let Some(item) = self.items.get(index) else {
                break;
            };

            let description = self.describe(item).await;
            self.slots.lock()[index] = Some(description);
        }
    }

    async fn describe(&self, item: &CanonicalRecord) -> String {
        let key = item.identity_key();
        if let Some(cached) = self.cache.get(&key) {
            return cached.into_text();
        }

        let resolved = timeout(
            self.lookup_timeout,
            resolve_description(self.lookup.as_ref(), &item.name, &item.region),
        )
        .await;

        match resolved {
            Ok(description) => {
                let cached = CachedDescription::from_lookup(description);
                self.cache.insert(key, cached.clone());
                cached.into_text()
            }
            // Not cached: the next request gets another chance.
            Err(_) => {
                counter!(DESCRIPTION_LOOKUP_TIMEOUT).increment(1);
                tracing::warn!(
                    name = %item.name,
                    region = %item.region,
                    "Description lookup timed out"
                );
                String::new()
            }
        }
    }
}
