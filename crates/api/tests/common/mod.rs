#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use navette_api::config::ServerConfig;
use navette_api::router::build_app_router;
use navette_api::state::AppState;
use navette_core::claims::{DayClaim, DayClaimSet, DayParity, Direction};
use navette_core::recurrence::RecurrenceDefinition;
use navette_planning::config::ScheduleConfig;
use navette_planning::memory::InMemoryStore;
use navette_planning::service::PlanningService;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// Build the full application router over an in-memory store.
pub fn build_test_app(store: InMemoryStore) -> Router {
    let config = test_config();
    let state = AppState {
        planning: PlanningService::new(Arc::new(store), ScheduleConfig::default()),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// A definition on `circuit-leg:1` valid from 2024-01-01 with outbound claims.
pub fn definition(
    owner_id: i64,
    label: &str,
    claims: &[(u8, DayParity)],
) -> RecurrenceDefinition {
    let set = DayClaimSet::from_claims(
        claims.iter().map(|&(weekday, parity)| DayClaim { weekday, parity }),
    )
    .unwrap();
    RecurrenceDefinition::new(owner_id, label, "circuit-leg:1", d(2024, 1, 1))
        .with_claims(Direction::Outbound, set)
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send_json(app, Method::PUT, uri, body).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
