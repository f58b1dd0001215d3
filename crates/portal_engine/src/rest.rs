use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::{GatewayError, MutateOp, Query};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the hosted backend (REST, storage and realtime roots).
    pub base_url: String,
    /// Bearer token for authenticated calls; anonymous when absent.
    pub bearer_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_body_bytes: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:54321".to_string(),
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Uniform CRUD/storage access against the hosted backend.
///
/// This layer neither caches nor retries; failures surface as tagged
/// errors and retry policy stays with callers.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, GatewayError>;

    async fn mutate(
        &self,
        collection: &str,
        op: MutateOp,
        payload: Value,
    ) -> Result<Value, GatewayError>;

    /// Uploads to object storage and returns the publicly resolvable URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct RestGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl RestGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.redirect_limit))
            .build()
            .map_err(|err| GatewayError::Network(err.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{collection}", self.config.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<bytes::Bytes, GatewayError> {
        if let Some(len) = response.content_length() {
            if len > self.config.max_body_bytes {
                return Err(GatewayError::TooLarge {
                    max_bytes: self.config.max_body_bytes,
                    actual: Some(len),
                });
            }
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if body.len() as u64 > self.config.max_body_bytes {
            return Err(GatewayError::TooLarge {
                max_bytes: self.config.max_body_bytes,
                actual: Some(body.len() as u64),
            });
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Gateway for RestGateway {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, GatewayError> {
        let response = self
            .authorize(self.client.get(self.rest_url(collection)))
            .query(&query.to_pairs())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        let body = self.read_body(response).await?;
        serde_json::from_slice(&body).map_err(|err| GatewayError::Decode(err.to_string()))
    }

    async fn mutate(
        &self,
        collection: &str,
        op: MutateOp,
        payload: Value,
    ) -> Result<Value, GatewayError> {
        let url = self.rest_url(collection);
        let request = match &op {
            MutateOp::Insert => self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .header("Prefer", "return=representation")
                .body(payload.to_string()),
            MutateOp::Update { id } => self
                .client
                .patch(&url)
                .query(&[("id", format!("eq.{id}"))])
                .header(CONTENT_TYPE, "application/json")
                .header("Prefer", "return=representation")
                .body(payload.to_string()),
            MutateOp::Delete { filters } => {
                let query = Query {
                    conditions: filters.clone(),
                    ..Query::default()
                };
                self.client.delete(&url).query(&query.to_pairs())
            }
        };
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        if matches!(op, MutateOp::Delete { .. }) {
            return Ok(Value::Null);
        }
        let body = self.read_body(response).await?;
        let value: Value =
            serde_json::from_slice(&body).map_err(|err| GatewayError::Decode(err.to_string()))?;
        // PostgREST returns representations as arrays; a mutation touches
        // exactly one row.
        match value {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.remove(0)),
            Value::Array(_) => Err(GatewayError::NotFound),
            other => Ok(other),
        }
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.config.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .header(CONTENT_TYPE, content_type.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response)?;
        Ok(format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.config.base_url
        ))
    }
}

/// Maps HTTP status classes onto the tagged error taxonomy.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(match status.as_u16() {
        401 | 403 => GatewayError::Auth,
        404 => GatewayError::NotFound,
        409 => GatewayError::Conflict,
        code => GatewayError::HttpStatus(code),
    })
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        return GatewayError::Timeout;
    }
    GatewayError::Network(err.to_string())
}
