use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::rest::{check_status, map_reqwest_error};
use crate::{DriveEntry, EventSink, GatewayError, GatewayEvent, TransferId};

/// Delay before the single follow-up listing after an upload whose file has
/// not appeared yet.
pub const LIST_SETTLE_DELAY: Duration = Duration::from_millis(500);

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// How a call authenticates against the proxy. Admin-initiated calls carry
/// the `x-admin-token` header; user-initiated calls carry the session
/// bearer. The split mirrors the proxy's observed behaviour and is not
/// unified here.
#[derive(Debug, Clone)]
pub enum DriveAuth {
    AdminToken(String),
    Bearer(String),
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub base_url: String,
    /// Drive account the proxy acts for.
    pub user_id: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            user_id: String::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    files: Vec<DriveEntry>,
}

#[derive(Debug, Deserialize)]
struct UploadEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "fileId", default)]
    file_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FolderEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "folderId", default)]
    folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OauthEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BasicEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DriveProxyClient {
    config: DriveConfig,
    auth: DriveAuth,
    client: reqwest::Client,
}

impl DriveProxyClient {
    pub fn new(config: DriveConfig, auth: DriveAuth) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| GatewayError::Network(err.to_string()))?;
        Ok(Self {
            config,
            auth,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/google/{path}", self.config.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            DriveAuth::AdminToken(token) => request.header("x-admin-token", token),
            DriveAuth::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            DriveAuth::Anonymous => request,
        }
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let response = self
            .authorize(self.client.post(self.endpoint(path)))
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body).map_err(|err| GatewayError::Decode(err.to_string()))
    }

    pub async fn list(
        &self,
        parent_id: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<DriveEntry>, GatewayError> {
        let mut pairs = vec![("userId".to_string(), self.config.user_id.clone())];
        if let Some(parent) = parent_id {
            pairs.push(("parentId".to_string(), parent.to_string()));
        }
        if let Some(search) = search {
            pairs.push(("search".to_string(), search.to_string()));
        }
        let response = self
            .authorize(self.client.get(self.endpoint("list")))
            .query(&pairs)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let envelope: ListEnvelope =
            serde_json::from_slice(&body).map_err(|err| GatewayError::Decode(err.to_string()))?;
        if !envelope.success {
            return Err(provider_error(envelope.message));
        }
        Ok(envelope.files)
    }

    /// Lists after an upload, tolerating listing lag: when the fresh file
    /// is not visible yet, exactly one bounded retry after a fixed delay,
    /// then the listing is accepted as-is.
    pub async fn list_settled(
        &self,
        parent_id: Option<&str>,
        expected_file_id: &str,
    ) -> Result<Vec<DriveEntry>, GatewayError> {
        let entries = self.list(parent_id, None).await?;
        if entries.iter().any(|entry| entry.id == expected_file_id) {
            return Ok(entries);
        }
        portal_logging::portal_info!(
            "fresh file {} not yet listed, retrying once",
            expected_file_id
        );
        tokio::time::sleep(LIST_SETTLE_DELAY).await;
        self.list(parent_id, None).await
    }

    /// Uploads a file, emitting byte-level progress for the streamed
    /// request body.
    pub async fn upload(
        &self,
        transfer_id: TransferId,
        name: &str,
        mime_type: &str,
        data: &[u8],
        parent_id: Option<&str>,
        sink: Arc<dyn EventSink>,
    ) -> Result<String, GatewayError> {
        let mut payload = serde_json::json!({
            "userId": self.config.user_id,
            "name": name,
            "mimeType": mime_type,
            "data": base64::engine::general_purpose::STANDARD.encode(data),
        });
        if let Some(parent) = parent_id {
            payload["parentId"] = serde_json::Value::String(parent.to_string());
        }
        let body = payload.to_string().into_bytes();
        let total = body.len() as u64;

        let chunks: Vec<Result<bytes::Bytes, std::io::Error>> = body
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(|chunk| Ok(bytes::Bytes::copy_from_slice(chunk)))
            .collect();
        let progress_sink = sink.clone();
        let mut sent: u64 = 0;
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                let percent = ((sent * 100) / total.max(1)).min(100) as u8;
                progress_sink.emit(GatewayEvent::TransferProgress {
                    transfer_id,
                    percent,
                });
            }
            chunk
        }));

        let response = self
            .authorize(self.client.post(self.endpoint("upload")))
            .header(CONTENT_TYPE, "application/json")
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let envelope: UploadEnvelope =
            serde_json::from_slice(&body).map_err(|err| GatewayError::Decode(err.to_string()))?;
        if !envelope.success {
            return Err(provider_error(envelope.message));
        }
        envelope
            .file_id
            .ok_or_else(|| GatewayError::Decode("upload response missing fileId".to_string()))
    }

    /// Downloads a file, accumulating streamed chunks and deriving
    /// progress from `Content-Length`. Without the header the transfer
    /// stays indeterminate until completion.
    pub async fn download(
        &self,
        transfer_id: TransferId,
        file_id: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .authorize(self.client.get(self.endpoint("download")))
            .query(&[
                ("userId", self.config.user_id.as_str()),
                ("fileId", file_id),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        let total = response.content_length();

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            bytes.extend_from_slice(&chunk);
            if let Some(total) = total {
                let percent = ((bytes.len() as u64 * 100) / total.max(1)).min(100) as u8;
                sink.emit(GatewayEvent::TransferProgress {
                    transfer_id,
                    percent,
                });
            }
        }
        Ok(bytes)
    }

    pub async fn delete(&self, file_id: &str) -> Result<(), GatewayError> {
        let envelope: BasicEnvelope = self
            .post_json(
                "delete",
                serde_json::json!({
                    "userId": self.config.user_id,
                    "fileId": file_id,
                }),
            )
            .await?;
        if !envelope.success {
            return Err(provider_error(envelope.message));
        }
        Ok(())
    }

    pub async fn create_folder(
        &self,
        folder_name: &str,
        parent_id: Option<&str>,
    ) -> Result<String, GatewayError> {
        let mut payload = serde_json::json!({
            "userId": self.config.user_id,
            "folderName": folder_name,
        });
        if let Some(parent) = parent_id {
            payload["parentId"] = serde_json::Value::String(parent.to_string());
        }
        let envelope: FolderEnvelope = self.post_json("create-folder", payload).await?;
        if !envelope.success {
            return Err(provider_error(envelope.message));
        }
        envelope
            .folder_id
            .ok_or_else(|| GatewayError::Decode("folder response missing folderId".to_string()))
    }

    /// Starts the provider OAuth flow and returns the redirect URL.
    pub async fn oauth_start(&self) -> Result<String, GatewayError> {
        let envelope: OauthEnvelope = self
            .post_json(
                "oauth/start",
                serde_json::json!({ "userId": self.config.user_id }),
            )
            .await?;
        if !envelope.success {
            return Err(provider_error(envelope.message));
        }
        envelope
            .url
            .ok_or_else(|| GatewayError::Decode("oauth response missing url".to_string()))
    }

    pub async fn disconnect(&self) -> Result<(), GatewayError> {
        let envelope: BasicEnvelope = self
            .post_json(
                "disconnect",
                serde_json::json!({ "userId": self.config.user_id }),
            )
            .await?;
        if !envelope.success {
            return Err(provider_error(envelope.message));
        }
        Ok(())
    }
}

fn provider_error(message: Option<String>) -> GatewayError {
    GatewayError::Provider(message.unwrap_or_else(|| "request rejected".to_string()))
}
