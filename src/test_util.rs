//! In-memory mock of the workflow API for pipeline and scheduler tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::api::types::{
    DownloadTicket, FileStatus, ProcessedRef, ProcessingModel, RemoteFileRecord, UploadTicket,
};
use crate::api::WorkflowApi;
use crate::error::{StatusCategory, WorkflowError};

/// Mock that stores uploaded bytes in memory and echoes them back on
/// download. Failure injection is per-operation.
pub(crate) struct MockApi {
    state: Mutex<MockState>,
    calls: AtomicUsize,
    /// Fail `register_file` when the filename contains this substring
    fail_register_matching: Option<String>,
    /// Fail `trigger_processing` unconditionally
    fail_processing: bool,
    /// Track how many pipelines are inside an API call right now
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[derive(Default)]
struct MockState {
    /// object key or file id -> uploaded bytes
    blobs: HashMap<String, Vec<u8>>,
    models: Vec<Option<ProcessingModel>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            calls: AtomicUsize::new(0),
            fail_register_matching: None,
            fail_processing: false,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fail_register_matching(mut self, needle: &str) -> Self {
        self.fail_register_matching = Some(needle.to_string());
        self
    }

    pub fn fail_processing(mut self) -> Self {
        self.fail_processing = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_models(&self) -> Vec<Option<ProcessingModel>> {
        self.state.lock().unwrap().models.clone()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlightGuard<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        InFlightGuard { mock: self }
    }

    fn record(&self, id: &str, filename: &str, status: FileStatus) -> RemoteFileRecord {
        RemoteFileRecord {
            id: id.to_string(),
            filename: filename.to_string(),
            format: None,
            size: None,
            status,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            parent_file_id: None,
            page_count: None,
            char_count: None,
            analysis_result: None,
        }
    }
}

struct InFlightGuard<'a> {
    mock: &'a MockApi,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.mock.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn remote(status: u16, message: &str, context: &'static str) -> WorkflowError {
    WorkflowError::Remote {
        status,
        category: StatusCategory::from_status(status),
        message: message.to_string(),
        context,
    }
}

#[async_trait]
impl WorkflowApi for MockApi {
    async fn request_upload_ticket(
        &self,
        filename: &str,
        _mime_type: &str,
        _size_bytes: u64,
    ) -> Result<UploadTicket, WorkflowError> {
        let _guard = self.enter();
        Ok(UploadTicket {
            upload_url: format!("mock://upload/{}", filename),
            object_key: format!("obj-{}", filename),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    async fn upload_bytes(
        &self,
        ticket: &UploadTicket,
        local_path: &Path,
        _mime_type: &str,
    ) -> Result<(), WorkflowError> {
        let _guard = self.enter();
        // Let sibling pipelines overlap so max_in_flight is observable
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| WorkflowError::Io {
                context: "uploading",
                source,
            })?;
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(ticket.object_key.clone(), bytes);
        Ok(())
    }

    async fn register_file(
        &self,
        filename: &str,
        object_key: &str,
    ) -> Result<RemoteFileRecord, WorkflowError> {
        let _guard = self.enter();
        if let Some(needle) = &self.fail_register_matching {
            if filename.contains(needle.as_str()) {
                return Err(remote(409, "duplicate object key", "registering file"));
            }
        }

        let file_id = format!("id-{}", filename);
        let mut state = self.state.lock().unwrap();
        if let Some(bytes) = state.blobs.get(object_key).cloned() {
            state.blobs.insert(file_id.clone(), bytes);
        }
        Ok(self.record(&file_id, filename, FileStatus::Uploaded))
    }

    async fn trigger_processing(
        &self,
        file_id: &str,
        model: Option<ProcessingModel>,
    ) -> Result<ProcessedRef, WorkflowError> {
        let _guard = self.enter();
        self.state.lock().unwrap().models.push(model);
        if self.fail_processing {
            return Err(remote(500, "processing crashed", "requesting processing"));
        }

        let processed_id = format!("{}-proc", file_id);
        let mut state = self.state.lock().unwrap();
        if let Some(bytes) = state.blobs.get(file_id).cloned() {
            state.blobs.insert(processed_id.clone(), bytes);
        }
        Ok(ProcessedRef {
            processed_file_id: processed_id,
        })
    }

    async fn fetch_record(&self, file_id: &str) -> Result<RemoteFileRecord, WorkflowError> {
        let _guard = self.enter();
        if !self.state.lock().unwrap().blobs.contains_key(file_id) {
            return Err(WorkflowError::NotFound {
                file_id: file_id.to_string(),
            });
        }
        Ok(self.record(file_id, "processed-output", FileStatus::Processed))
    }

    async fn request_download_ticket(
        &self,
        file_id: &str,
        _expires_in_seconds: u64,
    ) -> Result<DownloadTicket, WorkflowError> {
        let _guard = self.enter();
        Ok(DownloadTicket {
            download_url: format!("mock://download/{}", file_id),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    async fn download_bytes(
        &self,
        ticket: &DownloadTicket,
        output_path: &Path,
    ) -> Result<(), WorkflowError> {
        let _guard = self.enter();
        let file_id = ticket
            .download_url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let bytes = self
            .state
            .lock()
            .unwrap()
            .blobs
            .get(&file_id)
            .cloned()
            .ok_or(WorkflowError::NotFound { file_id })?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| WorkflowError::Io {
                        context: "downloading result",
                        source,
                    })?;
            }
        }
        tokio::fs::write(output_path, bytes)
            .await
            .map_err(|source| WorkflowError::Io {
                context: "downloading result",
                source,
            })
    }
}
