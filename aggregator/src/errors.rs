use crate::config::ValidationError;
use crate::pollution_source::SourceError;
use crate::summaries::LookupError;
use thiserror::Error;

/// Result type alias for aggregator operations
pub type Result<T, E = AggregatorError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("failed to fetch pollution data: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error("could not build pollution source client: {0}")]
    SourceClient(SourceError),

    #[error("could not build summary client: {0}")]
    SummaryClient(#[from] LookupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
