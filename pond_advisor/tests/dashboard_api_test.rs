//! Route-level tests for the dashboard API.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use pond_advisor::{
    diagnostics::RecommendationLog,
    discretizer::DiscretizedState,
    policy::{ActionValueRow, PolicyTable},
    server::{create_router, AppState},
    Action, Advisor,
};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;
use tracing_test::traced_test;

/// Router over a two-state policy, logging into a fresh temp dir.
fn test_app() -> (Router, TempDir) {
    let mut table = PolicyTable::new();
    // (28.0, 7.2, 6.0)
    table.insert(DiscretizedState::new(3, 2, 4), ActionValueRow([2.0, 1.0, 0.5, 0.0]));
    // (27.0, 7.0, 1.5)
    table.insert(DiscretizedState::new(3, 2, 1), ActionValueRow([0.0, 4.0, 1.0, 2.0]));

    let dir = tempdir().unwrap();
    let log = RecommendationLog::new(dir.path().join("pond_logs.csv"));
    let app = create_router(AppState::new(Advisor::new(table), log), false);
    (app, dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_health_reports_learned_states() {
    let (app, _dir) = test_app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["learned_states"], 2);
}

#[tokio::test]
#[traced_test]
async fn test_recommend_known_condition_is_logged() {
    let (app, _dir) = test_app();

    let (status, body) = send(
        &app,
        post_json(
            "/recommend",
            json!({"temperature": 27.0, "ph": 7.0, "dissolved_oxygen": 1.5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "recommended");
    assert_eq!(body["action"], 1);
    assert_eq!(body["label"], Action::Aerate.label());
    assert_eq!(body["state"], json!([3, 2, 1]));
    assert_eq!(body["health_score"], 2);

    let (status, log) = send(&app, get("/log")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = log.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["Recommended Action"], Action::Aerate.label());
    assert_eq!(entries[0]["DO (mg/L)"], 1.5);
}

#[tokio::test]
#[traced_test]
async fn test_recommend_unknown_condition_is_not_logged() {
    let (app, _dir) = test_app();

    let (status, body) = send(
        &app,
        post_json(
            "/recommend",
            json!({"temperature": 34.0, "ph": 9.0, "dissolved_oxygen": 9.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unknown_condition");
    assert!(body.get("action").is_none());

    let (_, log) = send(&app, get("/log")).await;
    assert_eq!(log, json!([]));
}

#[tokio::test]
#[traced_test]
async fn test_recommend_rejects_non_numeric_readings() {
    let (app, _dir) = test_app();
    let (status, _) = send(
        &app,
        post_json(
            "/recommend",
            json!({"temperature": "warm", "ph": 7.0, "dissolved_oxygen": 5.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/recommend", json!({"ph": 7.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, log) = send(&app, get("/log")).await;
    assert_eq!(log, json!([]));
}

#[tokio::test]
#[traced_test]
async fn test_simulate_day_rejects_non_numeric_readings() {
    let (app, _dir) = test_app();
    let (status, _) = send(
        &app,
        post_json(
            "/simulate-day",
            json!({"temperature": 30.0, "ph": "neutral", "dissolved_oxygen": 5.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[traced_test]
async fn test_concurrent_recommendations_are_all_logged() {
    let (app, _dir) = test_app();
    let request = json!({"temperature": 28.0, "ph": 7.2, "dissolved_oxygen": 6.0});

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            send(&app, post_json("/recommend", request)).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let (status, log) = send(&app, get("/log")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = log.as_array().unwrap();
    assert_eq!(entries.len(), 8);
    assert!(entries
        .iter()
        .all(|e| e["Recommended Action"] == Action::NoOp.label()));
}

#[tokio::test]
#[traced_test]
async fn test_status_reports_each_reading() {
    let (app, _dir) = test_app();
    let (status, body) = send(
        &app,
        get("/status?temperature=31.0&ph=7.0&dissolved_oxygen=4.0"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health_score"], 1);
    let readings = body["readings"].as_array().unwrap();
    assert_eq!(readings[0]["status"], "out_of_range");
    assert_eq!(readings[1]["status"], "ok");
    assert_eq!(readings[2]["status"], "out_of_range");

    let (status, _) = send(&app, get("/status?temperature=abc&ph=7&dissolved_oxygen=4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[traced_test]
async fn test_simulate_day_stays_in_bounds() {
    let (app, _dir) = test_app();
    let (status, body) = send(
        &app,
        post_json(
            "/simulate-day",
            json!({"temperature": 35.0, "ph": 9.5, "dissolved_oxygen": 0.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let t = body["temperature"].as_f64().unwrap();
    let p = body["ph"].as_f64().unwrap();
    let o = body["dissolved_oxygen"].as_f64().unwrap();
    assert!((34.6..=35.0).contains(&t));
    assert!((9.2..=9.5).contains(&p));
    assert_eq!(o, 0.0);
}
