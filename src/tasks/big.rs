use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::config::BigTaskConfig;
use crate::error::{PoolError, Result};
use crate::scheduler::job::{JobResult, Payload, Task};

/// Adds a product through a remote HTTP API.
///
/// POSTs `{"title": <productName>}` to the configured endpoint and returns
/// the response body, which must be a JSON object. The status code is not
/// inspected; error bodies are relayed like any other object.
#[derive(Debug, Clone)]
pub struct BigTask {
    client: reqwest::Client,
    url: String,
}

impl BigTask {
    pub fn new(config: &BigTaskConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(PoolError::HttpClient)?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Task for BigTask {
    async fn run(&self, payload: Payload) -> JobResult {
        let body = json!({ "title": payload.get("productName") });

        let response = self.client.post(&self.url).json(&body).send().await?;
        let bytes = response.bytes().await?;
        let object: Map<String, Value> = serde_json::from_slice(&bytes)?;

        Ok(Value::Object(object))
    }
}
