//! GraphQL transport
//!
//! [`GraphqlTransport`] is the seam between the compiler and whatever answers
//! GraphQL requests: [`HttpTransport`] talks to the real backend over HTTP,
//! [`crate::services::memory::MemoryBackend`] answers in-process.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::graphql::orm::{CompiledQuery, ParameterMap};

/// Errors raised while executing a document
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend answered with status {status}")]
    Status { status: StatusCode, body: String },

    #[error("GraphQL errors: {}", .0.join("; "))]
    Graphql(Vec<String>),

    #[error("Unexpected response envelope for {entity}: {message}")]
    Envelope { entity: String, message: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One GraphQL request: a document plus its bound variables
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(rename = "variables", default)]
    pub params: ParameterMap,
}

impl GraphqlRequest {
    pub fn new(compiled: &CompiledQuery, params: ParameterMap) -> Self {
        Self {
            query: compiled.document.clone(),
            operation_name: Some(compiled.operation_name.clone()),
            params,
        }
    }
}

/// Raw response: HTTP status plus the decoded JSON body
#[derive(Debug, Clone)]
pub struct GraphqlResponse {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl GraphqlResponse {
    pub fn ok(body: JsonValue) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// Messages of the `errors` array, empty when the body carries none
    pub fn error_messages(&self) -> Vec<String> {
        self.body
            .get("errors")
            .and_then(JsonValue::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| {
                        e.get("message")
                            .and_then(JsonValue::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| e.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fail on a non-2xx status or a body that carries `errors`
    pub fn into_checked(self) -> Result<JsonValue, ClientError> {
        if !self.status.is_success() {
            return Err(ClientError::Status {
                status: self.status,
                body: self.body.to_string(),
            });
        }
        let errors = self.error_messages();
        if !errors.is_empty() {
            return Err(ClientError::Graphql(errors));
        }
        Ok(self.body)
    }
}

/// Executes GraphQL requests
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ClientError>;
}

/// GraphQL over HTTP with bearer-token auth
pub struct HttpTransport {
    endpoint: String,
    token: Option<String>,
    client: Client,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            token,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ClientError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        tracing::trace!(status = %status, bytes = text.len(), "GraphQL response received");

        let body = if text.trim().is_empty() {
            JsonValue::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                // Proxies answer errors with HTML; keep the status meaningful
                Err(_) if !status.is_success() => {
                    return Err(ClientError::Status { status, body: text });
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(GraphqlResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_serializes_params_as_variables() {
        let mut params = ParameterMap::new();
        params.insert("page".into(), json!(1));
        let request = GraphqlRequest {
            query: "query Q($page: Int) { q(page: $page) }".into(),
            operation_name: Some("Q".into()),
            params,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "query": "query Q($page: Int) { q(page: $page) }",
                "operationName": "Q",
                "variables": { "page": 1 }
            })
        );
    }

    #[test]
    fn test_into_checked() {
        let ok = GraphqlResponse::ok(json!({ "data": {} }));
        assert!(ok.into_checked().is_ok());

        let errors = GraphqlResponse::ok(json!({ "errors": [{ "message": "Forbidden" }] }));
        assert_matches!(
            errors.into_checked(),
            Err(ClientError::Graphql(messages)) if messages == vec!["Forbidden"]
        );

        let status = GraphqlResponse {
            status: StatusCode::BAD_GATEWAY,
            body: JsonValue::Null,
        };
        assert_matches!(
            status.into_checked(),
            Err(ClientError::Status { status, .. }) if status == StatusCode::BAD_GATEWAY
        );
    }
}
