//! HTTP API tests driven through the router with in-memory collaborators

mod support;

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use cloud_failover::types::{FAILOVER_COMPLETED_MESSAGE, STATE_FILE_RESET_MESSAGE};
use cloud_failover::{
    CloudEnvironment, Declaration, FailoverOperations, FailoverSettings, TaskState, TaskStatus,
};
use cloud_failover_server::http_server::INVALID_BODY_MESSAGE;
use cloud_failover_server::{AppState, MetricsRegistry, router};
use serde_json::{Value, json};
use std::sync::Arc;
use support::{HOSTNAME, MemoryFactory, StaticDevice};
use tower::ServiceExt;

const BASE: &str = "/mgmt/shared/cloud-failover";

fn app(factory: &Arc<MemoryFactory>, declaration: Option<Declaration>) -> Router {
    let state = AppState::new(
        factory.clone(),
        Arc::new(StaticDevice),
        FailoverSettings::default(),
        declaration,
    )
    .with_metrics(Arc::new(MetricsRegistry::new()));
    router(Arc::new(state), BASE)
}

async fn send(app: &Router, method: Method, path: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(format!("{}{}", BASE, path))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn declaration_body() -> String {
    json!({
        "class": "Cloud_Failover",
        "environment": "aws",
        "externalStorage": { "scopingTags": { "f5_cloud_failover_label": "mydeployment" } },
        "failoverAddresses": { "scopingTags": { "f5_cloud_failover_label": "mydeployment" } },
        "controls": { "class": "Controls", "logLevel": "info" }
    })
    .to_string()
}

#[tokio::test]
async fn test_info() {
    let factory = Arc::new(MemoryFactory::default());
    let (status, body) = send(&app(&factory, None), Method::GET, "/info", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(body["schemaCurrent"], json!("1.1.0"));
    assert_eq!(body["schemaMinimum"], json!("0.9.1"));
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let factory = Arc::new(MemoryFactory::default());
    let (status, body) = send(&app(&factory, None), Method::GET, "/bogus", "").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"message": "Invalid Endpoint"}));
}

#[tokio::test]
async fn test_method_not_allowed() {
    let factory = Arc::new(MemoryFactory::default());
    let app = app(&factory, None);

    let (status, body) = send(&app, Method::GET, "/reset", "").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({"message": "Method Not Allowed"}));

    let (status, _) = send(&app, Method::DELETE, "/trigger", "").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_invalid_body() {
    let factory = Arc::new(MemoryFactory::default());
    let (status, body) = send(
        &app(&factory, None),
        Method::POST,
        "/reset",
        "resetStateFile=true",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!(INVALID_BODY_MESSAGE));
}

#[tokio::test]
async fn test_reset_before_declaration() {
    let factory = Arc::new(MemoryFactory::default());
    factory.store(TaskState::failed(HOSTNAME, "boom", FailoverOperations::default()));

    let (status, body) = send(
        &app(&factory, None),
        Method::POST,
        "/reset",
        r#"{"resetStateFile": true}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": STATE_FILE_RESET_MESSAGE}));
    let stored = factory.stored().unwrap();
    assert_eq!(stored.task_state, TaskStatus::Pass);
    assert!(stored.failover_operations.is_empty());
}

#[tokio::test]
async fn test_reset_without_flag_keeps_state() {
    let factory = Arc::new(MemoryFactory::default());
    let failed = TaskState::failed(HOSTNAME, "boom", FailoverOperations::default());
    factory.store(failed.clone());

    let (status, body) = send(&app(&factory, None), Method::POST, "/reset", "{}").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "No action performed"}));
    assert_eq!(factory.stored(), Some(failed));
}

#[tokio::test]
async fn test_trigger_get_maps_state_to_status() {
    let factory = Arc::new(MemoryFactory::default());
    let app = app(&factory, None);

    let (status, body) = send(&app, Method::GET, "/trigger", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["taskState"], json!("SUCCEEDED"));

    factory.store(TaskState::running("bigip2"));
    let (status, body) = send(&app, Method::GET, "/trigger", "").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["code"], json!(202));

    factory.store(TaskState::failed(HOSTNAME, "boom", FailoverOperations::default()));
    let (status, body) = send(&app, Method::GET, "/trigger", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["taskState"], json!("FAILED"));
}

#[tokio::test]
async fn test_trigger_without_declaration_fails() {
    let factory = Arc::new(MemoryFactory::default());
    let (status, body) = send(&app(&factory, None), Method::POST, "/trigger", "").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("Declaration not provided"));
    assert!(factory.stored().is_none());
}

#[tokio::test]
async fn test_trigger_post_runs_failover() {
    let factory = Arc::new(MemoryFactory::default());
    let app = app(&factory, Some(Declaration::new(CloudEnvironment::Aws)));

    let (status, body) = send(&app, Method::POST, "/trigger", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["taskState"], json!("SUCCEEDED"));
    assert_eq!(body["message"], json!(FAILOVER_COMPLETED_MESSAGE));
    assert_eq!(body["instance"], json!(HOSTNAME));
    assert_eq!(*factory.inits.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_trigger_post_while_running_locally() {
    let factory = Arc::new(MemoryFactory::default());
    factory.store(TaskState::running(HOSTNAME));
    let app = app(&factory, Some(Declaration::new(CloudEnvironment::Aws)));

    let (status, body) = send(&app, Method::POST, "/trigger", "").await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["taskState"], json!("RUNNING"));
    assert_eq!(*factory.inits.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_declare_then_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("declaration.json");
    let factory = Arc::new(MemoryFactory::default());
    let state = AppState::new(
        factory.clone(),
        Arc::new(StaticDevice),
        FailoverSettings::default(),
        None,
    )
    .with_declaration_path(&path);
    let app = router(Arc::new(state), BASE);

    let (status, body) = send(&app, Method::POST, "/declare", &declaration_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("success"));
    assert_eq!(body["declaration"]["environment"], json!("aws"));
    assert!(path.is_file());
    assert_eq!(*factory.inits.lock().unwrap(), 1);
    assert_eq!(
        factory.environments.lock().unwrap().last(),
        Some(&Some(CloudEnvironment::Aws))
    );

    let (status, body) = send(&app, Method::GET, "/declare", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["declaration"]["class"], json!("Cloud_Failover"));

    let (status, body) = send(&app, Method::POST, "/trigger", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["taskState"], json!("SUCCEEDED"));
}

#[tokio::test]
async fn test_declare_rejects_invalid_declaration() {
    let factory = Arc::new(MemoryFactory::default());
    let app = app(&factory, None);

    let (status, _) = send(
        &app,
        Method::POST,
        "/declare",
        r#"{"class": "Something_Else", "environment": "aws"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/declare",
        r#"{"class": "Cloud_Failover", "environment": "openstack"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::GET, "/declare", "").await;
    assert_eq!(body["declaration"], Value::Null);
}

#[tokio::test]
async fn test_declare_with_failed_init_keeps_previous_declaration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("declaration.json");
    let factory = Arc::new(MemoryFactory {
        reject_init: true,
        ..MemoryFactory::default()
    });
    let state = AppState::new(
        factory.clone(),
        Arc::new(StaticDevice),
        FailoverSettings::default(),
        None,
    )
    .with_declaration_path(&path);
    let app = router(Arc::new(state), BASE);

    let (status, body) = send(&app, Method::POST, "/declare", &declaration_body()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("no credentials"));
    assert_eq!(*factory.inits.lock().unwrap(), 1);

    // Neither the active nor the persisted declaration changed
    assert!(!path.exists());
    let (_, body) = send(&app, Method::GET, "/declare", "").await;
    assert_eq!(body["declaration"], Value::Null);
}

#[tokio::test]
async fn test_inspect() {
    let factory = Arc::new(MemoryFactory::default());
    let (status, body) = send(
        &app(&factory, Some(Declaration::new(CloudEnvironment::Azure))),
        Method::GET,
        "/inspect",
        "",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hostName"], json!(HOSTNAME));
    assert_eq!(body["deviceStatus"], json!("active"));
    assert_eq!(body["trafficGroup"], json!([{"name": "traffic-group-1"}]));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let factory = Arc::new(MemoryFactory::default());
    let app = app(&factory, Some(Declaration::new(CloudEnvironment::Gcp)));
    send(&app, Method::POST, "/trigger", "").await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"failover_executions_total{outcome="succeeded"} 1"#));
    assert!(text.contains(r#"failover_requests_total{endpoint="trigger",method="POST"} 1"#));
    assert!(text.contains("failover_task_state 0"));
}
