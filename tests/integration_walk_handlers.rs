use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

use wikiwalk::api::handlers::AppState;
use wikiwalk::api::routes::create_router;
use wikiwalk::services::{MockLinkSource, RunController, WalkConfig};

fn app() -> (Router, RunController) {
    let source = MockLinkSource::new()
        .with_page("Seed page", &["Second"], &["Topics"])
        .with_page("Second", &["Seed page"], &["Topics"])
        .with_page("Island", &[], &[]);
    let controller = RunController::new(Arc::new(source), WalkConfig::new().with_rng_seed(11));
    let state = Arc::new(AppState {
        controller: controller.clone(),
    });
    (create_router(state), controller)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.expect("router oneshot failed");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_reports_provider() {
    let (app, _) = app();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "wikiwalk");
    assert_eq!(json["components"]["link_source"], "mock");
    assert_eq!(json["components"]["walk_status"], "idle");
}

#[tokio::test]
async fn test_start_step_and_snapshot() {
    let (app, _) = app();

    let (status, json) = send(
        &app,
        "POST",
        "/v1/walk/start",
        Some(serde_json::json!({ "title": "Seed page", "autorun": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["seed"]["id"], "Seed_page");
    assert_eq!(json["stats"]["status"], "paused");

    let (status, json) = send(&app, "POST", "/v1/walk/step", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"]["outcome"], "advanced");
    assert_eq!(json["outcome"]["report"]["current"], "Second");
    assert_eq!(json["stats"]["step_count"], 1);

    let (status, json) = send(&app, "GET", "/v1/walk", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["edge_counts"]["walk"], 1);
    assert_eq!(json["edge_counts"]["similarity"], 1);
    assert_eq!(json["seed"], "Seed_page");

    let (_, json) = send(&app, "GET", "/v1/walk/log", None).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["entries"][0]["id"], "Second");
}

#[tokio::test]
async fn test_path_and_selection() {
    let (app, _) = app();
    send(
        &app,
        "POST",
        "/v1/walk/start",
        Some(serde_json::json!({ "title": "Seed page", "autorun": false })),
    )
    .await;
    send(&app, "POST", "/v1/walk/step", None).await;

    let (status, json) = send(&app, "GET", "/v1/walk/path/Second", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hops"], 1);
    assert_eq!(json["path"], serde_json::json!(["Second", "Seed_page"]));

    let (status, json) = send(&app, "GET", "/v1/walk/path/Unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["success"], false);

    let (_, json) = send(
        &app,
        "POST",
        "/v1/walk/select",
        Some(serde_json::json!({ "node_id": "Second" })),
    )
    .await;
    assert_eq!(json["selection"]["outcome"], "selected");

    let (_, json) = send(
        &app,
        "POST",
        "/v1/walk/select",
        Some(serde_json::json!({ "node_id": "Second" })),
    )
    .await;
    assert_eq!(json["selection"]["outcome"], "cleared");
}

#[tokio::test]
async fn test_validation_errors() {
    let (app, _) = app();

    let (status, json) = send(
        &app,
        "POST",
        "/v1/walk/start",
        Some(serde_json::json!({ "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        "PUT",
        "/v1/walk/branching",
        Some(serde_json::json!({ "factor": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, "POST", "/v1/walk/step", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");

    let (status, _) = send(&app, "POST", "/v1/walk/resume", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_branching_and_reset() {
    let (app, controller) = app();

    let (status, json) = send(
        &app,
        "PUT",
        "/v1/walk/branching",
        Some(serde_json::json!({ "factor": 16 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["factor"], 16);
    assert_eq!(json["experimental"], true);

    let (_, json) = send(&app, "GET", "/v1/walk/feedback", None).await;
    assert_eq!(json["feedback"]["severity"], "warning");

    send(
        &app,
        "POST",
        "/v1/walk/start",
        Some(serde_json::json!({ "title": "Seed page", "autorun": false })),
    )
    .await;
    let (status, json) = send(&app, "POST", "/v1/walk/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stats"]["node_count"], 0);
    assert_eq!(json["stats"]["branch_factor"], 16);
    assert!(!controller.is_running());
}
