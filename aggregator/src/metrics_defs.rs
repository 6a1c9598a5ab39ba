//! Metrics definitions for the aggregator.

use shared::metrics_defs::{MetricDef, MetricType};

pub const DESCRIPTION_CACHE_HIT: MetricDef = MetricDef {
    name: "description_cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of description lookups served from the cache",
};

pub const DESCRIPTION_CACHE_NEGATIVE_HIT: MetricDef = MetricDef {
    name: "description_cache.negative_hit",
    metric_type: MetricType::Counter,
    description: "Number of cache hits for cities known to have no description",
};

pub const DESCRIPTION_CACHE_MISS: MetricDef = MetricDef {
    name: "description_cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of description lookups that missed the cache",
};

pub const DESCRIPTION_CACHE_ENTRIES: MetricDef = MetricDef {
    name: "description_cache.entries",
    metric_type: MetricType::Gauge,
    description: "Number of cached descriptions, negative entries included",
};

pub const DESCRIPTION_LOOKUP_FAILED: MetricDef = MetricDef {
    name: "description_lookup.failed",
    metric_type: MetricType::Counter,
    description: "Number of candidate title lookups that errored",
};

pub const DESCRIPTION_LOOKUP_TIMEOUT: MetricDef = MetricDef {
    name: "description_lookup.timeout",
    metric_type: MetricType::Counter,
    description: "Number of items whose description could not be resolved in time",
};

pub const ENRICHMENT_DURATION: MetricDef = MetricDef {
    name: "enrichment.duration",
    metric_type: MetricType::Histogram,
    description: "Time to enrich one page in seconds",
};

pub const RECORDS_DROPPED: MetricDef = MetricDef {
    name: "records.dropped",
    metric_type: MetricType::Counter,
    description: "Number of raw records dropped by normalization or validation",
};

pub const SOURCE_FETCH_DURATION: MetricDef = MetricDef {
    name: "pollution_source.fetch.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch raw records from the pollution source in seconds",
};

pub const SOURCE_FETCH_FAILED: MetricDef = MetricDef {
    name: "pollution_source.fetch.failed",
    metric_type: MetricType::Counter,
    description: "Number of failed fetches from the pollution source",
};

// TODO: generate this list from the definitions above with a macro so new metrics cannot be missed.
pub const ALL_METRICS: &[MetricDef] = &[
    DESCRIPTION_CACHE_HIT,
    DESCRIPTION_CACHE_NEGATIVE_HIT,
    DESCRIPTION_CACHE_MISS,
    DESCRIPTION_CACHE_ENTRIES,
    DESCRIPTION_LOOKUP_FAILED,
    DESCRIPTION_LOOKUP_TIMEOUT,
    ENRICHMENT_DURATION,
    RECORDS_DROPPED,
    SOURCE_FETCH_DURATION,
    SOURCE_FETCH_FAILED,
];
