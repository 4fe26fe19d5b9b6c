//! HTTP API: declare, trigger, reset, inspect, info and Prometheus metrics.

use crate::state::AppState;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use cloud_failover::declaration::SCHEMA_VERSIONS;
use cloud_failover::{Declaration, ResetRequest, TaskState};
use common::Error;
use prometheus_client::encoding::text::encode;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const INVALID_BODY_MESSAGE: &str =
    "Invalid request body. Content type should be application/json";

/// HTTP server for the failover API
pub struct ApiServer {
    state: Arc<AppState>,
    listen_addr: String,
    base_path: String,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>, listen_addr: String, base_path: String) -> Self {
        Self {
            state,
            listen_addr,
            base_path,
        }
    }

    /// Run the HTTP server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = router(self.state, &self.base_path);

        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, base_path = %self.base_path, "API server listening");

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Build the API router with every endpoint nested under `base_path`
pub fn router(state: Arc<AppState>, base_path: &str) -> Router {
    let api = Router::new()
        .route(
            "/declare",
            get(get_declaration)
                .post(post_declaration)
                .fallback(method_not_allowed),
        )
        .route(
            "/trigger",
            get(get_trigger).post(post_trigger).fallback(method_not_allowed),
        )
        .route("/reset", post(post_reset).fallback(method_not_allowed))
        .route("/inspect", get(get_inspect).fallback(method_not_allowed))
        .route("/info", any(get_info));

    let mut app = Router::new().nest(base_path, api);
    if state.metrics.is_some() {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.fallback(invalid_endpoint)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Error body returned by every endpoint: `{"message": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, message = %self.message, "Request failed");
        }
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Decode a JSON body; an empty body reads as `{}`
fn parse_body(body: &Bytes) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejecting non-JSON body");
        ApiError::bad_request(INVALID_BODY_MESSAGE)
    })
}

fn count(state: &AppState, endpoint: &str, method: &str) {
    if let Some(metrics) = &state.metrics {
        metrics.record_request(endpoint, method);
    }
}

/// Respond with a task state, using its code as the HTTP status
fn task_state_response(state: &AppState, task_state: TaskState) -> Response {
    if let Some(metrics) = &state.metrics {
        metrics.set_task_state(task_state.task_state);
    }
    let status =
        StatusCode::from_u16(task_state.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(task_state)).into_response()
}

async fn post_declaration(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    count(&state, "declare", "POST");
    let declaration = Declaration::from_json(parse_body(&body)?)?;
    state.install(declaration.clone()).await?;
    Ok(Json(json!({ "message": "success", "declaration": declaration })))
}

async fn get_declaration(State(state): State<Arc<AppState>>) -> Json<Value> {
    count(&state, "declare", "GET");
    let declaration = state.declaration().await;
    Json(json!({ "message": "success", "declaration": declaration }))
}

/// Current task state; RUN→202, PASS→200, otherwise 400
async fn get_trigger(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    count(&state, "trigger", "GET");
    let mut task_state = state.orchestrator().await.get_task_state_file().await?;
    task_state.code = task_state.task_state.code();
    Ok(task_state_response(&state, task_state))
}

async fn post_trigger(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    count(&state, "trigger", "POST");
    let orchestrator = state.orchestrator().await;

    let (current, hostname) = tokio::try_join!(
        orchestrator.get_task_state_file(),
        orchestrator.local_hostname(),
    )?;
    if current.is_running_on(&hostname) {
        debug!(hostname = %hostname, "Failover is already executing");
        if let Some(metrics) = &state.metrics {
            metrics.record_skipped_execution();
        }
        return Ok(task_state_response(&state, current));
    }

    let started = Instant::now();
    let result = orchestrator.execute().await;
    if let Some(metrics) = &state.metrics {
        let outcome = if result.is_ok() { "succeeded" } else { "failed" };
        metrics.record_execution(outcome, started.elapsed());
    }
    if let Err(e) = result {
        if let Some(metrics) = &state.metrics {
            metrics.set_task_state(cloud_failover::TaskStatus::Fail);
        }
        return Err(e.into());
    }

    let task_state = orchestrator.get_task_state_file().await?;
    Ok(task_state_response(&state, task_state))
}

async fn post_reset(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Json<Value>> {
    count(&state, "reset", "POST");
    let request: ResetRequest =
        serde_json::from_value(parse_body(&body)?).map_err(ApiError::bad_request)?;

    let response = state
        .orchestrator()
        .await
        .reset_failover_state(request)
        .await?;
    if request.reset_state_file {
        if let Some(metrics) = &state.metrics {
            metrics.record_reset();
            metrics.set_task_state(cloud_failover::TaskStatus::Pass);
        }
    }
    Ok(Json(json!({ "message": response.message })))
}

async fn get_inspect(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    count(&state, "inspect", "GET");
    let status = state
        .orchestrator()
        .await
        .get_failover_status_and_objects()
        .await?;
    Ok(Json(status).into_response())
}

async fn get_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    count(&state, "info", "GET");
    let version = env!("CARGO_PKG_VERSION");
    Json(json!({
        "version": version,
        "release": version.rsplit('.').next().unwrap_or(version),
        "schemaCurrent": SCHEMA_VERSIONS.first(),
        "schemaMinimum": SCHEMA_VERSIONS.last(),
    }))
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "message": "Method Not Allowed" })),
    )
        .into_response()
}

async fn invalid_endpoint() -> Response {
    ApiError::bad_request("Invalid Endpoint").into_response()
}

/// Handler for /metrics endpoint
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(metrics) = &state.metrics else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut buffer = String::new();
    if let Err(e) = encode(&mut buffer, &metrics.registry) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}
