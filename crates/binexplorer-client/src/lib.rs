//! HTTP transport for the BinExplorer analysis server's `/ajax/` endpoint.

use std::fmt;

use async_trait::async_trait;
use binexplorer_config::BackendRuntimeConfig;
use binexplorer_core::{CoreError, QueryDescriptor, QueryResponse, QueryStatus, RemoteQueryClient};
use serde_json::Value;

const QUERY_PATH: &str = "/ajax/";

#[derive(Clone)]
pub struct HttpQueryClient {
    endpoint: String,
    client: reqwest::Client,
}

impl fmt::Debug for HttpQueryClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpQueryClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpQueryClient {
    pub fn new(config: &BackendRuntimeConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .user_agent("binexplorer/client")
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!(
                    "failed to initialize analysis server HTTP client: {err}"
                ))
            })?;

        Ok(Self {
            endpoint: query_endpoint(&config.base_url),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteQueryClient for HttpQueryClient {
    async fn query(&self, descriptor: QueryDescriptor) -> Result<QueryResponse, CoreError> {
        let tag = descriptor.wire_tag();
        let args = descriptor.wire_args();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", tag), ("args", args.as_str())])
            .send()
            .await
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!(
                    "failed to call analysis server for '{tag}': {err}"
                ))
            })?;

        let status = QueryStatus::new(response.status().as_u16());
        let body = response.text().await.map_err(|err| {
            CoreError::DependencyUnavailable(format!(
                "failed to read analysis server response for '{tag}': {err}"
            ))
        })?;

        tracing::debug!(
            query = tag,
            %status,
            body = %truncate_for_log(&body),
            "analysis server responded"
        );
        Ok(QueryResponse::new(status, parse_body(&body)))
    }
}

fn query_endpoint(base_url: &str) -> String {
    format!("{}{QUERY_PATH}", base_url.trim_end_matches('/'))
}

/// JSON bodies are decoded; anything else is kept as a JSON string.
fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
}

fn truncate_for_log(body: &str) -> String {
    const MAX_LEN: usize = 200;
    if body.chars().count() <= MAX_LEN {
        body.to_owned()
    } else {
        format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
    }
}
