//! Wire types for the accessibility API.
//!
//! Every response arrives in the `{success, message, data}` envelope; `data`
//! is unwrapped by the client and the payload types below are its shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response envelope wrapping every API payload.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

/// Server-side lifecycle status of a file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
    Deleted,
    /// Forward compatibility with statuses this client does not know
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
            Self::Unknown => "unknown",
        }
    }
}

/// The server's bookkeeping entity for an uploaded or derived file. Owned
/// entirely by the remote service; this client only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileRecord {
    pub id: String,

    pub filename: String,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    pub status: FileStatus,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Set on processed outputs, pointing back at the source upload
    #[serde(default)]
    pub parent_file_id: Option<String>,

    #[serde(default)]
    pub page_count: Option<u32>,

    #[serde(default)]
    pub char_count: Option<u64>,

    /// Opaque analysis payload; never interpreted client-side
    #[serde(default)]
    pub analysis_result: Option<serde_json::Value>,
}

/// Short-lived signed URL for the upload leg. Single use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub upload_url: String,
    pub object_key: String,
    pub expires_at: DateTime<Utc>,
}

/// Short-lived signed URL for the final retrieval leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTicket {
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Reference to the processed output returned by the processing trigger.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRef {
    pub processed_file_id: String,
}

/// Processing model selector. Only meaningful for document inputs; the
/// pipeline never forwards it for markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingModel {
    Fast,
    Balanced,
    Thorough,
}

impl ProcessingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }
}

// Request bodies

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadUrlRequest<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterFileRequest<'a> {
    pub filename: &'a str,
    pub object_key: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadUrlRequest {
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_unwraps_camel_case_record() {
        let json = r#"{
            "success": true,
            "message": "ok",
            "data": {
                "id": "f-123",
                "filename": "report.pdf",
                "format": "pdf",
                "size": 1024,
                "status": "processed",
                "createdAt": "2024-05-01T12:00:00Z",
                "parentFileId": "f-100",
                "pageCount": 4,
                "charCount": 9000
            }
        }"#;

        let envelope: ApiEnvelope<RemoteFileRecord> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        let record = envelope.data.unwrap();
        assert_eq!(record.id, "f-123");
        assert_eq!(record.status, FileStatus::Processed);
        assert_eq!(record.parent_file_id.as_deref(), Some("f-100"));
        assert_eq!(record.page_count, Some(4));
        assert!(record.analysis_result.is_none());
    }

    #[test]
    fn test_envelope_without_data() {
        let json = r#"{"success": false, "message": "bad object key"}"#;
        let envelope: ApiEnvelope<RemoteFileRecord> = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("bad object key"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let json = r#"{"id": "x", "filename": "a.pdf", "status": "archived"}"#;
        let record: RemoteFileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, FileStatus::Unknown);
    }

    #[test]
    fn test_upload_ticket_round_trip() {
        let json = r#"{
            "uploadUrl": "https://bucket.example/put/abc",
            "objectKey": "uploads/abc",
            "expiresAt": "2024-05-01T12:30:00Z"
        }"#;
        let ticket: UploadTicket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.object_key, "uploads/abc");
    }

    #[test]
    fn test_process_request_omits_absent_model() {
        let body = serde_json::to_string(&ProcessRequest { model: None }).unwrap();
        assert_eq!(body, "{}");

        let body = serde_json::to_string(&ProcessRequest {
            model: Some(ProcessingModel::Thorough.as_str()),
        })
        .unwrap();
        assert_eq!(body, r#"{"model":"thorough"}"#);
    }
}
