// TTL cache of city descriptions keyed by (name, region). Lookups that found
// nothing are stored too, so a city without a description is not looked up
// again until its entry expires.
use crate::metrics_defs::{
    DESCRIPTION_CACHE_ENTRIES, DESCRIPTION_CACHE_HIT, DESCRIPTION_CACHE_MISS,
    DESCRIPTION_CACHE_NEGATIVE_HIT,
};
use crate::record::IdentityKey;
use moka::sync::Cache;
use shared::{counter, gauge};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum CachedDescription {
    Found(String),
    /// Looked up, no description available.
    NotFound,
}

impl CachedDescription {
    pub fn from_lookup(description: Option<String>) -> Self {
        match description {
            Some(text) if !text.is_empty() => CachedDescription::Found(text),
            _ => CachedDescription::NotFound,
        }
    }

    /// The text served to clients. Unknown descriptions are empty.
    pub fn into_text(self) -> String {
        match self {
            CachedDescription::Found(text) => text,
            CachedDescription::NotFound => String::new(),
        }
    }
}

/// Shared by every enrichment worker and request; clones refer to the same entries.
#[derive(Clone)]
pub struct DescriptionCache {
    cache: Cache<IdentityKey, CachedDescription>,
}

impl DescriptionCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        DescriptionCache { cache }
    }

    /// Returns `None` when the key was never looked up or its entry expired.
    pub fn get(&self, key: &IdentityKey) -> Option<CachedDescription> {
        let cached = self.cache.get(key);
        let metric_def = match cached {
            Some(CachedDescription::Found(_)) => DESCRIPTION_CACHE_HIT,
            Some(CachedDescription::NotFound) => DESCRIPTION_CACHE_NEGATIVE_HIT,
            None => DESCRIPTION_CACHE_MISS,
        };
        counter!(metric_def).increment(1);
        tracing::debug!(
            name = %key.name,
            region = %key.region,
            outcome = metric_def.name,
            "Description cache lookup"
        );
        cached
    }

    pub fn insert(&self, key: IdentityKey, value: CachedDescription) {
        self.cache.insert(key, value);
        gauge!(DESCRIPTION_CACHE_ENTRIES).set(self.cache.entry_count() as f64);
    }

    /// Number of live entries, after applying pending evictions.
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}
