//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use opendata_auth::directory::Tier;
use opendata_test_support::MutableClock;

use opendata_api::config::Config;
use opendata_api::routes;
use opendata_api::state::AppState;

/// A fully wired application over a temporary data directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<MutableClock>,
    _data_dir: TempDir,
}

/// Starting timestamp used across all integration tests.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// Builds the full app with seeded accounts and data files.
pub fn build_test_app() -> TestApp {
    build_test_app_with(|_config| {})
}

/// Builds the full app, letting the test adjust the configuration
/// first. Uses the same route structure as `main.rs`.
pub fn build_test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let data_dir = TempDir::new().unwrap();
    seed_data_files(&data_dir);

    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: data_dir.path().to_path_buf(),
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "opendata-test".to_string(),
        access_token_ttl: Duration::minutes(15),
        refresh_token_ttl: Duration::days(1),
        rate_limit_free: 3,
        rate_limit_basic: 60,
        rate_limit_premium: 600,
        cache_ttl: Duration::seconds(60),
        dispatch_interval: StdDuration::from_millis(250),
        failure_threshold: 3,
        failure_window: Duration::seconds(300),
        users: vec![
            ("alice".to_string(), "wonderland".to_string(), Tier::Premium),
            ("bob".to_string(), "builder".to_string(), Tier::Free),
        ],
    };
    adjust(&mut config);

    let clock = Arc::new(MutableClock::new(start_time()));
    let state = AppState::from_config(&config, clock.clone());

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/auth", routes::auth::router())
        .nest("/api/v1/data", routes::data::router(state.clone()))
        .with_state(state.clone());

    TestApp {
        router,
        state,
        clock,
        _data_dir: data_dir,
    }
}

fn seed_data_files(dir: &TempDir) {
    let datasets = dir.path().join("datasets");
    std::fs::create_dir_all(&datasets).unwrap();
    std::fs::write(
        datasets.join("population.json"),
        r#"{"title": "Population by ward", "rows": [{"ward": "north", "count": 1204}, {"ward": "south", "count": 988}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("catalog.json"),
        r#"{"datasets": ["datasets/population.json"]}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "not json at all").unwrap();
}

/// Send a request and return the raw response.
pub async fn send(app: Router, request: Request<Body>) -> axum::response::Response {
    app.oneshot(request).await.unwrap()
}

/// Build a GET request with optional bearer token and `If-None-Match`.
pub fn get_request(uri: &str, bearer: Option<&str>, if_none_match: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(etag) = if_none_match {
        builder = builder.header(header::IF_NONE_MATCH, etag);
    }
    builder.body(Body::empty()).unwrap()
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a bearer token and no body.
pub async fn post_with_bearer(app: Router, uri: &str, token: &str) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    app.oneshot(request).await.unwrap().status()
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = send(app, get_request(uri, None, None)).await;
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request with a bearer token and return the response.
pub async fn get_json_with_bearer(
    app: Router,
    uri: &str,
    token: &str,
) -> (StatusCode, serde_json::Value) {
    let response = send(app, get_request(uri, Some(token), None)).await;
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Log in and return the parsed token response body.
pub async fn login(app: &TestApp, username: &str, password: &str) -> serde_json::Value {
    let (status, json) = post_json(
        app.router.clone(),
        "/api/v1/auth/login",
        &serde_json::json!({"username": username, "password": password}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {json}");
    json
}

/// Log in and return just the access token.
pub async fn access_token(app: &TestApp, username: &str, password: &str) -> String {
    login(app, username, password).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}
