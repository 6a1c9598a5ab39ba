use crate::config::Listener as ListenerConfig;
use crate::errors::AggregatorError;
use crate::pipeline::{CityAggregator, PageRequest, PageResponse};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

const DEFAULT_PAGE: usize = 1;
const DEFAULT_LIMIT: usize = 10;

/// Every request is logged at info level with its method, path, status and latency.
pub fn router(aggregator: CityAggregator) -> Router {
    Router::new()
        .route("/cities", get(cities_handler))
        .route("/health", get(ok_handler))
        .route("/ready", get(ok_handler))
        .with_state(aggregator)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

pub async fn serve(listener: ListenerConfig, aggregator: CityAggregator) -> Result<(), AggregatorError> {
    let app = router(aggregator);

    let addr = format!("{}:{}", listener.host, listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

// Query values are parsed leniently: anything unparseable falls back to the default.
#[derive(Deserialize, Debug, Default)]
struct CitiesParams {
    country: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

impl CitiesParams {
    fn into_request(self, max_page_limit: usize) -> PageRequest {
        let page = parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(self.limit.as_deref())
            .unwrap_or(DEFAULT_LIMIT)
            .min(max_page_limit);

        PageRequest {
            region: self
                .country
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            page,
            limit,
        }
    }
}

// Zero and negative values are clamped to 1.
fn parse_positive(value: Option<&str>) -> Option<usize> {
    let parsed = value?.trim().parse::<i64>().ok()?;
    Some(usize::try_from(parsed.max(1)).unwrap_or(usize::MAX))
}

async fn cities_handler(
    State(aggregator): State<CityAggregator>,
    Query(params): Query<CitiesParams>,
) -> Result<Json<PageResponse>, AggregatorError> {
    let request = params.into_request(aggregator.max_page_limit());
    aggregator.get_page(&request).await.map(Json)
}

async fn ok_handler() -> &'static str {
    "ok\n"
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error: String,
}

impl IntoResponse for AggregatorError {
    fn into_response(self) -> Response {
        let status = match self {
            AggregatorError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            AggregatorError::InvalidConfig(_)
            | AggregatorError::SourceClient(_)
            | AggregatorError::SummaryClient(_)
            | AggregatorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ApiErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollutionRange;
    use crate::description_cache::DescriptionCache;
    use crate::enricher::Enricher;
    use crate::testutils::{StubLookup, StubResponse, StubSource};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(source: StubSource, lookup: StubLookup) -> Router {
        let enricher = Enricher::new(
            Arc::new(lookup),
            DescriptionCache::new(Duration::from_secs(60), 100),
            5,
            Duration::from_secs(5),
        );
        router(CityAggregator::new(
            Arc::new(source),
            enricher,
            PollutionRange::default(),
            100,
        ))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_cities_endpoint() {
        let source = StubSource::with_records(vec![
            json!({"city": "delhi", "country": "india", "pm25": 210}),
            json!({"city": "dhaka", "country": "bangladesh", "pm25": 180}),
            json!({"city": "lahore", "country": "pakistan", "pm25": "195,5"}),
        ]);
        let lookup =
            StubLookup::new().respond("Delhi", StubResponse::Description("Capital territory of India"));

        let (status, body) = get(app(source, lookup), "/cities?page=1&limit=2").await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({
                "page": 1,
                "limit": 2,
                "total": 3,
                "cities": [
                    {
                        "name": "Delhi",
                        "region": "India",
                        "pollutionValue": 210.0,
                        "description": "Capital territory of India",
                    },
                    {
                        "name": "Lahore",
                        "region": "Pakistan",
                        "pollutionValue": 195.5,
                        "description": "",
                    },
                ],
            })
        );
    }

    #[tokio::test]
    async fn test_cities_endpoint_defaults_and_region_filter() {
        let source = Arc::new(StubSource::with_records(Vec::new()));
        let enricher = Enricher::new(
            Arc::new(StubLookup::new()),
            DescriptionCache::new(Duration::from_secs(60), 100),
            5,
            Duration::from_secs(5),
        );
        let app = router(CityAggregator::new(
            source.clone(),
            enricher,
            PollutionRange::default(),
            100,
        ));

        let (status, body) = get(app, "/cities?country=Chile&page=abc&limit=-3").await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"page": 1, "limit": 1, "total": 0, "cities": []}));
        assert_eq!(source.queries()[0].region.as_deref(), Some("Chile"));
    }

    #[tokio::test]
    async fn test_source_failure_is_bad_gateway() {
        let (status, body) = get(app(StubSource::failing(), StubLookup::new()), "/cities").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("failed to fetch pollution data")
        );
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        for uri in ["/health", "/ready"] {
            let (status, body) = get(app(StubSource::failing(), StubLookup::new()), uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, b"ok\n");
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_requests_are_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (status, _) = get(app(StubSource::failing(), StubLookup::new()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get(app(StubSource::failing(), StubLookup::new()), "/cities").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert!(output.contains("uri=/health"), "{output}");
        assert!(output.contains("status=200"), "{output}");
        assert!(output.contains("uri=/cities"), "{output}");
        assert!(output.contains("status=502"), "{output}");
    }

    #[test]
    fn test_params_into_request() {
        let params = CitiesParams {
            country: Some("  ".into()),
            page: Some("3".into()),
            limit: Some("1000".into()),
        };
        assert_eq!(
            params.into_request(100),
            PageRequest {
                region: None,
                page: 3,
                limit: 100,
            }
        );

        assert_eq!(
            CitiesParams::default().into_request(100),
            PageRequest {
                region: None,
                page: 1,
                limit: 10,
            }
        );

        let params = CitiesParams {
            country: Some("Peru".into()),
            page: Some("0".into()),
            limit: Some("x".into()),
        };
        assert_eq!(
            params.into_request(100),
            PageRequest {
                region: Some("Peru".into()),
                page: 1,
                limit: 10,
            }
        );
    }
}
