use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aeris::config::Config;
use aeris::openaq::OpenAqClient;
use aeris::AerisError;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

const API_KEY: &str = "test-key";

#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

impl Hits {
    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v3")
}

fn client(base_url: &str, key: &str, max_retries: u32) -> OpenAqClient {
    let vars: HashMap<&str, String> = HashMap::from([
        ("OPENAQ_API_KEY", key.to_string()),
        ("OPENAQ_API_BASE_URL", base_url.to_string()),
        ("OPENAQ_MAX_RETRIES", max_retries.to_string()),
        ("OPENAQ_RETRY_BACKOFF", "0.01".to_string()),
        ("OPENAQ_TIMEOUT", "5".to_string()),
    ]);
    let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
    OpenAqClient::new(&config.openaq).unwrap()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

/// Fails twice with 503 before answering.
async fn flaky_latest(
    State(hits): State<Hits>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "invalid key"})));
    }
    if hits.bump() <= 2 {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "meta": {"found": 1},
            "results": [{
                "datetime": {"utc": "2025-03-01T12:00:00Z", "local": "2025-03-01T09:00:00-03:00"},
                "value": 21.0,
                "coordinates": {"latitude": -23.5, "longitude": -46.6},
                "sensorsId": 7771,
                "locationsId": id
            }]
        })),
    )
}

async fn echo_locations(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "meta": {"found": 1},
        "results": [{
            "id": 1,
            "name": query.get("radius").cloned().unwrap_or_default(),
            "locality": query.get("coordinates").cloned().unwrap_or_default()
        }]
    }))
}

async fn always_unavailable(State(hits): State<Hits>) -> StatusCode {
    hits.bump();
    StatusCode::SERVICE_UNAVAILABLE
}

async fn not_found(State(hits): State<Hits>) -> StatusCode {
    hits.bump();
    StatusCode::NOT_FOUND
}

async fn no_results() -> Json<Value> {
    Json(json!({"meta": {"found": 0}}))
}

#[tokio::test]
async fn test_retries_server_errors_then_succeeds() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/v3/locations/{id}/latest", get(flaky_latest))
        .with_state(hits.clone());
    let base = spawn(app).await;

    let latest = client(&base, API_KEY, 3).location_latest(2446).await.unwrap();

    assert_eq!(hits.count(), 3);
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].sensors_id, 7771);
    assert_eq!(latest[0].value, Some(21.0));
}

#[tokio::test]
async fn test_bad_key_is_unauthorized_without_retry() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/v3/locations/{id}/latest", get(flaky_latest))
        .with_state(hits.clone());
    let base = spawn(app).await;

    let err = client(&base, "wrong", 3)
        .location_latest(2446)
        .await
        .unwrap_err();

    assert!(matches!(err, AerisError::Unauthorized));
    assert_eq!(hits.count(), 0);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/v3/locations/{id}/latest", get(always_unavailable))
        .with_state(hits.clone());
    let base = spawn(app).await;

    let err = client(&base, API_KEY, 2)
        .location_latest(1)
        .await
        .unwrap_err();

    assert!(matches!(err, AerisError::Status { status: 503, .. }));
    assert_eq!(hits.count(), 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/v3/sensors/{id}/measurements", get(not_found))
        .with_state(hits.clone());
    let base = spawn(app).await;

    let err = client(&base, API_KEY, 3)
        .sensor_measurements(9, None, None, 10)
        .await
        .unwrap_err();

    assert!(matches!(err, AerisError::Status { status: 404, .. }));
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn test_radius_is_capped() {
    let app = Router::new().route("/v3/locations", get(echo_locations));
    let base = spawn(app).await;

    let locations = client(&base, API_KEY, 0)
        .locations_by_coordinates(-23.5505, -46.6333, 100_000, 10)
        .await
        .unwrap();

    assert_eq!(locations[0].name.as_deref(), Some("25000"));
    assert_eq!(locations[0].locality.as_deref(), Some("-23.5505,-46.6333"));
}

#[tokio::test]
async fn test_missing_results_is_empty() {
    let app = Router::new().route("/v3/locations", get(no_results));
    let base = spawn(app).await;

    let locations = client(&base, API_KEY, 0)
        .locations_by_country("BR", 100, Some(2))
        .await
        .unwrap();

    assert!(locations.is_empty());
}
