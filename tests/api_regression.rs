//! API Regression Tests
//!
//! Drives the full `/api/v1` router and checks response shapes: the
//! `{data, meta}` envelope, status codes before and after the first cycle,
//! and the fields dashboards read.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use pdm_trends::api::{create_app, ApiState};
use pdm_trends::report::{OutputFormat, ReportPublisher};
use pdm_trends::types::{LimitsRegistry, OperationalLimit};
use pdm_trends::{TrendConfig, TrendEngine};

fn test_state() -> ApiState {
    let limits: LimitsRegistry = ["GTM2:Temp", "GTM2:Flow", "GTM9:Idle"]
        .iter()
        .map(|id| (id.to_string(), OperationalLimit::new(0.0, 100.0)))
        .collect();
    let engine = Arc::new(TrendEngine::new(limits, TrendConfig::default()));

    let base = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
    for i in 0..4i32 {
        let t = base + Duration::seconds(60 * i64::from(i));
        engine.append("GTM2:Temp", 50.0 + 2.0 * f64::from(i), t);
        engine.append("GTM2:Flow", 60.0 - f64::from(i), t);
    }
    engine.append("GTM9:Idle", 0.0, base);

    ApiState::new(engine, Arc::new(ReportPublisher::new(OutputFormat::Text)))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_envelope_carries_counters() {
    let app = create_app(test_state());
    let (status, body) = get(&app, "/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["version"], "1");
    assert!(body["meta"]["timestamp"].is_string());
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["sensors_tracked"], 3);
    assert_eq!(body["data"]["limits_loaded"], 3);
    assert_eq!(body["data"]["readings_appended"], 9);
    assert_eq!(body["data"]["cycles_completed"], 0);
    assert!(body["data"]["last_report_at"].is_null());
}

#[tokio::test]
async fn report_is_unavailable_until_published() {
    let state = test_state();
    let app = create_app(state.clone());

    let (status, body) = get(&app, "/api/v1/report").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "NO_REPORT");
    assert_eq!(body["meta"]["version"], "1");

    state.publisher.publish(state.engine.run_cycle());

    let (status, body) = get(&app, "/api/v1/report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cycle"], 1);
    assert_eq!(body["meta"]["cycle"], 1);
    assert_eq!(body["data"]["sensor_trends"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["range_summary"]["offline"], 1);
}

#[tokio::test]
async fn machines_merge_trend_and_range_status() {
    let state = test_state();
    state.publisher.publish(state.engine.run_cycle());
    let app = create_app(state);

    let (status, body) = get(&app, "/api/v1/machines").await;
    assert_eq!(status, StatusCode::OK);

    let machines = body["data"].as_array().unwrap();
    assert_eq!(machines.len(), 2);
    assert_eq!(machines[0]["machine"], "GTM2");
    assert_eq!(machines[0]["trend"]["qualifying_sensors"], 2);
    assert_eq!(machines[0]["status"]["total_sensors"], 2);
    // GTM9 has too few points for a trend but still has a range status
    assert_eq!(machines[1]["machine"], "GTM9");
    assert!(machines[1]["trend"].is_null());
    assert_eq!(machines[1]["status"]["offline"], 1);
}

#[tokio::test]
async fn live_lookups_report_missing_sensors_and_machines() {
    let app = create_app(test_state());

    let (status, body) = get(&app, "/api/v1/sensors/GTM2:Temp").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sensor_id"], "GTM2:Temp");
    assert_eq!(body["data"]["direction"], "INCREASING");

    let (status, body) = get(&app, "/api/v1/sensors/GTM9:Idle").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_DATA");

    let (status, body) = get(&app, "/api/v1/sensors/GTM2:Unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NO_LIMIT");

    let (status, body) = get(&app, "/api/v1/machines/GTM2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["machine"], "GTM2");

    let (status, body) = get(&app, "/api/v1/machines/GTM").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "UNKNOWN_MACHINE");
}

#[tokio::test]
async fn unknown_routes_are_not_served() {
    let app = create_app(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v2/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
