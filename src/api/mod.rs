//! HTTP boundary: turns requests into jobs and job results into responses.
//!
//! Every response, success or failure, uses the same JSON envelope:
//! `{"status": bool, "message": string, "data": any}`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{PoolError, Result};
use crate::scheduler::{JobQueue, Task};

#[derive(Clone)]
pub struct ApiState {
    pub queue: JobQueue,
    pub heavy_task: Arc<dyn Task>,
    pub big_task: Arc<dyn Task>,
    /// How long a handler waits for its job. `None` waits forever.
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub status: bool,
    pub message: String,
    pub data: Value,
}

type ApiResponse = (StatusCode, Json<Envelope>);

#[derive(Deserialize)]
struct BigApiRequest {
    #[serde(default, alias = "Product")]
    product: String,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/heavyapi",
            get(heavy_api_handler).fallback(|| async {
                fail(StatusCode::METHOD_NOT_ALLOWED, "You must use GET method")
            }),
        )
        .route(
            "/bigapi",
            post(big_api_handler).fallback(|| async {
                fail(StatusCode::METHOD_NOT_ALLOWED, "You must use POST method")
            }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` is cancelled.
pub async fn run_api(
    addr: SocketAddr,
    state: ApiState,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Starting HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

/// First value of `key`, or `""`. Repeated keys are not an error.
fn first_value(pairs: &[(String, String)], key: &str) -> String {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

async fn heavy_api_handler(
    State(state): State<ApiState>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResponse {
    let pairs = match query {
        Ok(Query(pairs)) => pairs,
        Err(e) => return fail(StatusCode::BAD_REQUEST, &e.body_text()),
    };
    let sleep = first_value(&pairs, "sleep");
    let random = first_value(&pairs, "random");

    if sleep.is_empty() && random.is_empty() {
        return fail(
            StatusCode::BAD_REQUEST,
            "You must specify a sleep duration or random, ex: /heavyapi?sleep=35",
        );
    }

    let params = HashMap::from([
        ("sleep".to_string(), sleep),
        ("random".to_string(), random),
    ]);
    run_job(&state, state.heavy_task.clone(), params).await
}

async fn big_api_handler(State(state): State<ApiState>, body: Bytes) -> ApiResponse {
    let request: BigApiRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return fail(
                StatusCode::BAD_REQUEST,
                &format!("Request body must be JSON, ex: {{\"product\":\"iPhone\"}} ({})", e),
            );
        }
    };

    if request.product.is_empty() {
        return fail(
            StatusCode::BAD_REQUEST,
            "Product name is required as POST body, ex: {\"product\":\"iPhone\"}",
        );
    }

    let params = HashMap::from([("productName".to_string(), request.product)]);
    run_job(&state, state.big_task.clone(), params).await
}

async fn run_job(
    state: &ApiState,
    task: Arc<dyn Task>,
    params: HashMap<String, String>,
) -> ApiResponse {
    let submitted = match state.request_timeout {
        Some(timeout) => state.queue.submit_timeout(task, params, timeout).await,
        None => state.queue.submit(task, params).await,
    };

    match submitted {
        Ok(Ok(value)) => succeed(value),
        Ok(Err(e)) => fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Something went wrong. {}", e),
        ),
        Err(e @ PoolError::Timeout(_)) => fail(StatusCode::GATEWAY_TIMEOUT, &e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Job submission failed");
            fail(StatusCode::SERVICE_UNAVAILABLE, &e.to_string())
        }
    }
}

fn succeed(data: Value) -> ApiResponse {
    (
        StatusCode::OK,
        Json(Envelope {
            status: true,
            message: "Success".to_string(),
            data,
        }),
    )
}

fn fail(status: StatusCode, message: &str) -> ApiResponse {
    (
        status,
        Json(Envelope {
            status: false,
            message: message.to_string(),
            data: Value::Null,
        }),
    )
}
