//! End-to-end tests of the `/v1` API against the in-memory repository.

#![cfg(feature = "http-server")]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use openair_api::db::repositories::LocalRepository;
use openair_api::db::repository::{FullRepository, StationRepository};
use openair_api::http::{create_router, AppState};
use openair_api::models::{GeoPoint, NewStation, Station};

const TOKEN: &str = "3f2c-feeder";

async fn setup() -> (LocalRepository, Station, Router) {
    let repo = LocalRepository::new();
    let station = repo
        .create_station(&NewStation {
            token_id: TOKEN.to_string(),
            description: "Kitchen window".to_string(),
            is_public: true,
            location: GeoPoint::new(44.51, 48.70),
        })
        .await
        .unwrap();
    let app = create_router(AppState::new(
        Arc::new(repo.clone()) as Arc<dyn FullRepository>
    ));
    (repo, station, app)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (repo, _, app) = setup().await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["repository"], "connected");

    repo.set_healthy(false);
    let (_, body) = send(&app, get("/health")).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_feeder_upload_and_station_listing() {
    let (repo, station, app) = setup().await;
    let t1 = Utc::now().timestamp() - 120;

    let (status, body) = send(
        &app,
        post_json(
            "/v1/feeder",
            json!({
                "token_id": TOKEN,
                "version": "0.5.0",
                "measurements": [
                    {"timestamp": t1, "pm25": 12.1, "pm10": 55.0, "temperature": 21.5},
                    {"pm25": 35.5, "pm10": 20.0}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    assert_eq!(repo.measurement_count(), 2);

    let (status, body) = send(&app, get("/v1/stations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let listed = &body["stations"][0];
    assert_eq!(listed["id"], station.id.value());
    assert_eq!(listed["version"], "0.5.0");
    assert_eq!(listed["last_measurement"]["aqi"], 101);
    assert!(listed.get("token_id").is_none());
}

#[tokio::test]
async fn test_feeder_unknown_token_is_bad_request() {
    let (repo, _, app) = setup().await;

    let (status, body) = send(
        &app,
        post_json(
            "/v1/feeder",
            json!({"token_id": "nope", "measurements": [{"pm25": 1.0, "pm10": 1.0}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "bad_request");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("can't get station by token id [nope]"));
    assert_eq!(repo.measurement_count(), 0);
}

#[tokio::test]
async fn test_feeder_malformed_body() {
    let (_, _, app) = setup().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/feeder")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"token_id\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "bad_request");
}

#[tokio::test]
async fn test_stations_bbox_and_window() {
    let (repo, _, app) = setup().await;
    let old = Utc::now() - Duration::hours(2);
    send(
        &app,
        post_json(
            "/v1/feeder",
            json!({"token_id": TOKEN, "measurements": [{"timestamp": old.timestamp(), "pm25": 5.0}]}),
        ),
    )
    .await;
    assert_eq!(repo.measurement_count(), 1);

    let (_, body) = send(&app, get("/v1/stations?bbox=44,48,45,49")).await;
    assert_eq!(body["stations"].as_array().unwrap().len(), 1);
    assert_eq!(body["stations"][0]["last_measurement"]["pm25"], 5.0);

    let (_, body) = send(&app, get("/v1/stations?bbox=10,10,11,11")).await;
    assert_eq!(body["stations"], json!([]));

    let (_, body) = send(&app, get("/v1/stations?mlast=15m")).await;
    assert_eq!(body["stations"].as_array().unwrap().len(), 1);
    assert!(body["stations"][0].get("last_measurement").is_none());
}

#[tokio::test]
async fn test_stations_bad_parameters() {
    let (_, _, app) = setup().await;

    for uri in [
        "/v1/stations?bbox=1,2,3",
        "/v1/stations?bbox=a,b,c,d",
        "/v1/stations?mlast=15",
        "/v1/stations?mfrom=yesterday",
    ] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["status"], "bad_request", "{}", uri);
    }
}

#[tokio::test]
async fn test_stations_window_at_earliest_time() {
    let (repo, _, app) = setup().await;
    send(
        &app,
        post_json(
            "/v1/feeder",
            json!({"token_id": TOKEN, "measurements": [{"timestamp": 1560000000, "pm25": 5.0}]}),
        ),
    )
    .await;
    assert_eq!(repo.measurement_count(), 1);

    let uri = format!(
        "/v1/stations?mfrom={}&mlast=1h",
        chrono::DateTime::<Utc>::MIN_UTC.timestamp()
    );
    let (status, body) = send(&app, get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stations"].as_array().unwrap().len(), 1);
    assert!(body["stations"][0].get("last_measurement").is_none());
}

#[tokio::test]
async fn test_measurement_series() {
    let (_, station, app) = setup().await;
    send(
        &app,
        post_json(
            "/v1/feeder",
            json!({
                "token_id": TOKEN,
                "measurements": [
                    {"timestamp": 1560000000, "pm25": 10.0, "pm10": 100.0, "humidity": 40.0},
                    {"timestamp": 1560000060, "pm25": 25.0, "pm10": 80.0, "humidity": 41.0},
                    {"timestamp": 1560000120, "pm25": 1.0, "pm10": 1.0}
                ]
            }),
        ),
    )
    .await;

    let uri = format!(
        "/v1/measurements?station={}&from=1560000060&to=1560000000&v=aqi",
        station.id
    );
    let (status, body) = send(&app, get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["measurements"],
        json!([
            {"timestamp": 1560000000, "aqi": 73},
            {"timestamp": 1560000060, "aqi": 78}
        ])
    );
}

#[tokio::test]
async fn test_measurements_errors() {
    let (_, _, app) = setup().await;

    let (status, body) = send(&app, get("/v1/measurements?from=1&to=2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "'station' parameter not set");

    let (status, body) = send(&app, get("/v1/measurements?station=1&from=1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "'to' parameter not set");

    let (status, _) = send(&app, get("/v1/measurements?station=1&from=1&to=2&v=co2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/v1/measurements?station=99&from=1&to=2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");
}

#[tokio::test]
async fn test_storage_failure_is_server_error() {
    let (repo, _, app) = setup().await;
    repo.set_healthy(false);

    let (status, body) = send(&app, get("/v1/stations")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "server_error");
}

#[tokio::test]
async fn test_unknown_route() {
    let (_, _, app) = setup().await;

    let (status, body) = send(&app, get("/v1/schedules")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (_, _, app) = setup().await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/v1/stations")
        .header(header::ORIGIN, "https://map.example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("POST"));
    assert!(methods.contains("PUT"));
}
