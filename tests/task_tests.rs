//! Tests for the sample task bodies, run directly and through the pool.


use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{routing::post, Json, Router};
use serde_json::{json, Value};

use workpool_lite::config::BigTaskConfig;
use workpool_lite::error::TaskError;
use workpool_lite::scheduler::{Payload, Task};
use workpool_lite::tasks::{BigTask, HeavyTask};
use test_harness::TestPool;

fn payload(pairs: &[(&str, &str)]) -> Payload {
    Payload::new(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// Serve `app` on an ephemeral local port.
async fn spawn_upstream(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn big_task(url: String) -> BigTask {
    BigTask::new(&BigTaskConfig {
        url,
        timeout_ms: 2_000,
        accept_invalid_certs: false,
    })
    .unwrap()
}

// =============================================================================
// HeavyTask
// =============================================================================

#[tokio::test]
async fn test_heavy_task_returns_time() {
    let start = Instant::now();
    let result = HeavyTask::new().run(payload(&[("sleep", "35")])).await;

    assert_eq!(result.unwrap(), json!({ "task": "done", "time": "35" }));
    assert!(start.elapsed() >= Duration::from_millis(35));
}

#[tokio::test]
async fn test_heavy_task_fails_on_multiple_of_ten() {
    let result = HeavyTask::new().run(payload(&[("sleep", "50")])).await;

    match result {
        Err(TaskError::Failed(msg)) => {
            assert_eq!(msg, "error occurred while executing heavy task")
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_heavy_task_unparsable_sleep_fails_immediately() {
    let start = Instant::now();
    let result = HeavyTask::new().run(payload(&[("sleep", "abc")])).await;

    assert!(matches!(result, Err(TaskError::Failed(_))));
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_heavy_task_random_sleep_in_range() {
    let result = HeavyTask::new().run(payload(&[("random", "yes")])).await;

    // Random delays of 20, 30 and 40 fail; anything else reports its time.
    match result {
        Ok(value) => {
            let ms: u64 = value["time"].as_str().unwrap().parse().unwrap();
            assert!((20..50).contains(&ms));
            assert_ne!(ms % 10, 0);
        }
        Err(TaskError::Failed(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
    }
}

#[tokio::test]
async fn test_heavy_task_failure_through_pool() {
    let pool = TestPool::start(2, 10);
    let params = HashMap::from([("sleep".to_string(), "50".to_string())]);

    let result = pool
        .queue
        .submit(Arc::new(HeavyTask::new()), params)
        .await
        .unwrap();

    assert!(result.is_err(), "value must be absent when the task fails");
}

// =============================================================================
// BigTask
// =============================================================================

#[tokio::test]
async fn test_big_task_relays_upstream_json() {
    let app = Router::new().route(
        "/products/add",
        post(|Json(body): Json<Value>| async move {
            Json(json!({ "id": 101, "title": body["title"] }))
        }),
    );
    let addr = spawn_upstream(app).await;
    let task = big_task(format!("http://{}/products/add", addr));

    let value = task
        .run(payload(&[("productName", "iPhone")]))
        .await
        .unwrap();

    assert_eq!(value, json!({ "id": 101, "title": "iPhone" }));
}

#[tokio::test]
async fn test_big_task_escapes_product_name() {
    let app = Router::new().route(
        "/products/add",
        post(|Json(body): Json<Value>| async move { Json(body) }),
    );
    let addr = spawn_upstream(app).await;
    let task = big_task(format!("http://{}/products/add", addr));

    let value = task
        .run(payload(&[("productName", "say \"hi\"")]))
        .await
        .unwrap();

    assert_eq!(value, json!({ "title": "say \"hi\"" }));
}

#[tokio::test]
async fn test_big_task_rejects_non_object_body() {
    let app = Router::new().route("/products/add", post(|| async { "not json" }));
    let addr = spawn_upstream(app).await;
    let task = big_task(format!("http://{}/products/add", addr));

    let result = task.run(payload(&[("productName", "iPhone")])).await;

    assert!(matches!(result, Err(TaskError::Decode(_))));
}

#[tokio::test]
async fn test_big_task_reports_transport_error() {
    // Bind then drop a listener so the port is very likely closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let task = big_task(format!("http://{}/products/add", addr));
    let result = task.run(payload(&[("productName", "iPhone")])).await;

    assert!(matches!(result, Err(TaskError::Http(_))));
}

#[test]
fn test_big_task_uses_configured_url() {
    let task = big_task("http://127.0.0.1:9/add".to_string());
    assert_eq!(task.url(), "http://127.0.0.1:9/add");
}
