pub mod api;
pub mod config;
pub mod description_cache;
pub mod enricher;
pub mod errors;
pub mod metrics_defs;
pub mod pipeline;
pub mod pollution_source;
pub mod ranking;
pub mod record;
pub mod summaries;

#[cfg(test)]
mod testutils;

use errors::AggregatorError;
use pipeline::CityAggregator;

/// Validates the config and serves the cities API until the listener fails.
pub async fn run(config: config::Config) -> Result<(), AggregatorError> {
    config.validate()?;

    let aggregator = CityAggregator::from_config(&config)?;
    tracing::info!(
        concurrency = config.enrichment.concurrency,
        cache_ttl_secs = config.enrichment.cache_ttl_secs,
        "Starting polluted cities API"
    );

    api::serve(config.listener, aggregator).await
}
