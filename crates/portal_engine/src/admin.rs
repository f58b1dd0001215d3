use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::rest::{check_status, map_reqwest_error};
use crate::{AdminToken, GatewayError};

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// Client for the static-credential admin login endpoint. The server
/// compares one hardcoded pair and returns a fixed bearer token; hardening
/// this boundary is out of scope.
#[derive(Debug, Clone)]
pub struct AdminAuthClient {
    base_url: String,
    client: reqwest::Client,
}

impl AdminAuthClient {
    pub fn new(base_url: String, request_timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| GatewayError::Network(err.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminToken, GatewayError> {
        let payload = serde_json::json!({
            "username": username,
            "password": password,
        });
        let response = self
            .client
            .post(format!("{}/api/admin/login", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let envelope: LoginEnvelope =
            serde_json::from_slice(&body).map_err(|err| GatewayError::Decode(err.to_string()))?;
        if !envelope.success {
            return Err(GatewayError::Auth);
        }
        let token = envelope.token.ok_or_else(|| {
            GatewayError::Decode(envelope.message.unwrap_or_else(|| "missing token".to_string()))
        })?;
        Ok(AdminToken {
            username: username.to_string(),
            token,
        })
    }
}
