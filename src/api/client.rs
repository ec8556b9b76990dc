//! HTTP client for the accessibility API.
//!
//! Seven operations, each a single request/response round trip. Three
//! dedicated `reqwest::Client` instances carry the per-operation timeout
//! tiers: short for metadata calls, long for the binary transfer legs, and
//! extended for the processing trigger (server-side processing is
//! synchronous from this client's perspective).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use super::types::{
    ApiEnvelope, DownloadTicket, DownloadUrlRequest, ProcessRequest, ProcessedRef,
    ProcessingModel, RegisterFileRequest, RemoteFileRecord, UploadTicket, UploadUrlRequest,
};
use crate::error::{StatusCategory, WorkflowError};

/// Metadata operations: upload-url, register, fetch, download-url.
const SHORT_TIMEOUT: Duration = Duration::from_secs(30);
/// Binary transfer legs against signed URLs.
const LONG_TIMEOUT: Duration = Duration::from_secs(300);
/// Processing trigger; the server processes before responding.
const EXTENDED_TIMEOUT: Duration = Duration::from_secs(600);

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Default lifetime requested for download tickets.
pub const DEFAULT_DOWNLOAD_TTL_SECS: u64 = 3600;

/// The seven remote workflow operations. The pipeline and scheduler only
/// ever see this trait, so tests can run against a mock.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    async fn request_upload_ticket(
        &self,
        filename: &str,
        mime_type: &str,
        size_bytes: u64,
    ) -> Result<UploadTicket, WorkflowError>;

    async fn upload_bytes(
        &self,
        ticket: &UploadTicket,
        local_path: &Path,
        mime_type: &str,
    ) -> Result<(), WorkflowError>;

    async fn register_file(
        &self,
        filename: &str,
        object_key: &str,
    ) -> Result<RemoteFileRecord, WorkflowError>;

    async fn trigger_processing(
        &self,
        file_id: &str,
        model: Option<ProcessingModel>,
    ) -> Result<ProcessedRef, WorkflowError>;

    async fn fetch_record(&self, file_id: &str) -> Result<RemoteFileRecord, WorkflowError>;

    async fn request_download_ticket(
        &self,
        file_id: &str,
        expires_in_seconds: u64,
    ) -> Result<DownloadTicket, WorkflowError>;

    async fn download_bytes(
        &self,
        ticket: &DownloadTicket,
        output_path: &Path,
    ) -> Result<(), WorkflowError>;
}

/// Live client against the accessibility API.
pub struct ApiClient {
    base_url: String,
    api_key: String,
    meta_client: Client,
    transfer_client: Client,
    processing_client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let meta_client = Client::builder()
            .timeout(SHORT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()?;
        let transfer_client = Client::builder()
            .timeout(LONG_TIMEOUT)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;
        let processing_client = Client::builder()
            .timeout(EXTENDED_TIMEOUT)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            meta_client,
            transfer_client,
            processing_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        client: &Client,
        path: &str,
        body: &B,
        context: &'static str,
    ) -> Result<T, WorkflowError> {
        let response = client
            .post(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|source| WorkflowError::Transfer { context, source })?;
        read_envelope(response, context).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &'static str,
    ) -> Result<T, WorkflowError> {
        let response = self
            .meta_client
            .get(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|source| WorkflowError::Transfer { context, source })?;
        read_envelope(response, context).await
    }
}

#[async_trait]
impl WorkflowApi for ApiClient {
    async fn request_upload_ticket(
        &self,
        filename: &str,
        mime_type: &str,
        size_bytes: u64,
    ) -> Result<UploadTicket, WorkflowError> {
        tracing::debug!("[Api] requesting upload ticket for {} ({} bytes)", filename, size_bytes);
        let body = UploadUrlRequest {
            filename,
            content_type: mime_type,
            size_bytes,
        };
        self.post_json(&self.meta_client, "/files/upload-url", &body, "requesting upload URL")
            .await
    }

    async fn upload_bytes(
        &self,
        ticket: &UploadTicket,
        local_path: &Path,
        mime_type: &str,
    ) -> Result<(), WorkflowError> {
        const CONTEXT: &str = "uploading";

        let meta = tokio::fs::metadata(local_path)
            .await
            .map_err(|source| WorkflowError::Io { context: CONTEXT, source })?;
        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|source| WorkflowError::Io { context: CONTEXT, source })?;

        tracing::debug!(
            "[Api] uploading {} ({} bytes) to signed URL",
            local_path.display(),
            meta.len()
        );

        let response = self
            .transfer_client
            .put(&ticket.upload_url)
            .header(CONTENT_TYPE, mime_type)
            .header(CONTENT_LENGTH, meta.len())
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|source| WorkflowError::Transfer { context: CONTEXT, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(translate_status(status.as_u16(), &body, CONTEXT));
        }
        Ok(())
    }

    async fn register_file(
        &self,
        filename: &str,
        object_key: &str,
    ) -> Result<RemoteFileRecord, WorkflowError> {
        tracing::debug!("[Api] registering {} under {}", filename, object_key);
        let body = RegisterFileRequest { filename, object_key };
        self.post_json(&self.meta_client, "/files", &body, "registering file")
            .await
    }

    async fn trigger_processing(
        &self,
        file_id: &str,
        model: Option<ProcessingModel>,
    ) -> Result<ProcessedRef, WorkflowError> {
        tracing::debug!("[Api] triggering processing for {} (model: {:?})", file_id, model);
        let path = format!("/files/{}/accessibility", file_id);
        let body = ProcessRequest {
            model: model.map(|m| m.as_str()),
        };
        self.post_json(&self.processing_client, &path, &body, "requesting processing")
            .await
    }

    async fn fetch_record(&self, file_id: &str) -> Result<RemoteFileRecord, WorkflowError> {
        let path = format!("/files/{}", file_id);
        match self.get_json(&path, "fetching processed record").await {
            Err(WorkflowError::Remote {
                status: 404, ..
            }) => Err(WorkflowError::NotFound {
                file_id: file_id.to_string(),
            }),
            other => other,
        }
    }

    async fn request_download_ticket(
        &self,
        file_id: &str,
        expires_in_seconds: u64,
    ) -> Result<DownloadTicket, WorkflowError> {
        let path = format!("/files/{}/download-url", file_id);
        let body = DownloadUrlRequest {
            expires_in: expires_in_seconds,
        };
        self.post_json(&self.meta_client, &path, &body, "requesting download URL")
            .await
    }

    async fn download_bytes(
        &self,
        ticket: &DownloadTicket,
        output_path: &Path,
    ) -> Result<(), WorkflowError> {
        const CONTEXT: &str = "downloading result";

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| WorkflowError::Io { context: CONTEXT, source })?;
            }
        }

        let response = self
            .transfer_client
            .get(&ticket.download_url)
            .send()
            .await
            .map_err(|source| WorkflowError::Transfer { context: CONTEXT, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(translate_status(status.as_u16(), &body, CONTEXT));
        }

        // Stream into a sibling .part file and rename into place, so a
        // failed transfer never modifies a pre-existing output file.
        let part_path = part_path_for(output_path);
        let result = write_stream(response, &part_path, CONTEXT).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&part_path).await;
            return result;
        }

        tokio::fs::rename(&part_path, output_path)
            .await
            .map_err(|source| WorkflowError::Io { context: CONTEXT, source })?;

        tracing::debug!("[Api] downloaded result to {}", output_path.display());
        Ok(())
    }
}

async fn write_stream(
    response: Response,
    part_path: &Path,
    context: &'static str,
) -> Result<(), WorkflowError> {
    let mut file = tokio::fs::File::create(part_path)
        .await
        .map_err(|source| WorkflowError::Io { context, source })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| WorkflowError::Transfer { context, source })?;
        file.write_all(&chunk)
            .await
            .map_err(|source| WorkflowError::Io { context, source })?;
    }
    file.flush()
        .await
        .map_err(|source| WorkflowError::Io { context, source })?;
    Ok(())
}

fn part_path_for(output_path: &Path) -> std::path::PathBuf {
    let name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output_path.with_file_name(format!("{}.part", name))
}

/// Unwrap the response envelope, translating non-2xx statuses and
/// `success: false` bodies into structured errors.
async fn read_envelope<T: DeserializeOwned>(
    response: Response,
    context: &'static str,
) -> Result<T, WorkflowError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(translate_status(status.as_u16(), &body, context));
    }

    let envelope: ApiEnvelope<T> = response
        .json()
        .await
        .map_err(|source| WorkflowError::Transfer { context, source })?;

    if !envelope.success {
        return Err(WorkflowError::Remote {
            status: StatusCode::OK.as_u16(),
            category: StatusCategory::Other,
            message: envelope
                .message
                .unwrap_or_else(|| "request rejected by the API".to_string()),
            context,
        });
    }

    envelope.data.ok_or_else(|| WorkflowError::Remote {
        status: StatusCode::OK.as_u16(),
        category: StatusCategory::Other,
        message: "response envelope carried no data".to_string(),
        context,
    })
}

/// Translate a non-2xx response into a `Remote` error. If the body parses
/// as the API envelope its message is used; otherwise the raw body stands.
/// Well-known statuses get a fixed category layered in front of the message.
fn translate_status(status: u16, body: &str, context: &'static str) -> WorkflowError {
    let server_message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| body.trim().to_string());

    let category = StatusCategory::from_status(status);
    let message = match category {
        StatusCategory::Other => server_message,
        known => {
            if server_message.is_empty() {
                known.as_str().to_string()
            } else {
                format!("{}: {}", known.as_str(), server_message)
            }
        }
    };

    WorkflowError::Remote {
        status,
        category,
        message,
        context,
    }
}
