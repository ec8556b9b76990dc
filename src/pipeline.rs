//! Single-item workflow pipeline.
//!
//! Runs one file through the seven-step remote workflow as a fail-fast
//! state machine: each step is exactly one API call, success advances,
//! the first failure ends the run. Nothing is rolled back on failure; a
//! partially uploaded but unprocessed remote record is left as-is.

use std::path::PathBuf;

use crate::api::types::{ProcessingModel, RemoteFileRecord};
use crate::api::{WorkflowApi, DEFAULT_DOWNLOAD_TTL_SECS};
use crate::classify::{self, FileKind};
use crate::error::WorkflowError;
use crate::logger::BatchLogger;

/// One input→output pair queued for processing. Immutable once scheduled.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub kind: FileKind,
}

/// Terminal result of running one work item through the workflow.
/// Produced exactly once per item, wherever in the sequence it failed.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub input_path: PathBuf,
    pub success: bool,
    pub original_record: Option<RemoteFileRecord>,
    pub processed_record: Option<RemoteFileRecord>,
    pub error_message: Option<String>,
}

/// Records accumulated while stepping through the workflow, kept outside
/// the error path so a late failure still reports what was created.
#[derive(Default)]
struct StepState {
    original: Option<RemoteFileRecord>,
    processed: Option<RemoteFileRecord>,
}

/// Run one work item to a terminal state. All errors are absorbed here;
/// the caller always gets exactly one outcome.
pub async fn run_pipeline(
    api: &dyn WorkflowApi,
    logger: &dyn BatchLogger,
    item: &WorkItem,
    model: Option<ProcessingModel>,
) -> PipelineOutcome {
    let mut state = StepState::default();

    match run_steps(api, logger, item, model, &mut state).await {
        Ok(()) => {
            if let Some(record) = &state.processed {
                logger.debug(&format!(
                    "[Pipeline] processed record {} ({})",
                    record.id,
                    record.status.as_str()
                ));
            }
            logger.info(&format!(
                "[Pipeline] done: {} -> {}",
                item.input_path.display(),
                item.output_path.display()
            ));
            PipelineOutcome {
                input_path: item.input_path.clone(),
                success: true,
                original_record: state.original,
                processed_record: state.processed,
                error_message: None,
            }
        }
        Err(err) => {
            logger.error(&format!(
                "[Pipeline] failed: {}: {}",
                item.input_path.display(),
                err
            ));
            PipelineOutcome {
                input_path: item.input_path.clone(),
                success: false,
                original_record: state.original,
                processed_record: state.processed,
                error_message: Some(err.to_string()),
            }
        }
    }
}

async fn run_steps(
    api: &dyn WorkflowApi,
    logger: &dyn BatchLogger,
    item: &WorkItem,
    model: Option<ProcessingModel>,
    state: &mut StepState,
) -> Result<(), WorkflowError> {
    // Gate before any network call
    if !item.kind.is_supported() {
        let extension = item
            .input_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        return Err(WorkflowError::Unsupported {
            path: item.input_path.clone(),
            extension,
        });
    }

    let filename = item
        .input_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| item.input_path.to_string_lossy().to_string());
    let mime_type = classify::mime_for(&item.input_path);
    let size_bytes = tokio::fs::metadata(&item.input_path)
        .await
        .map_err(|source| WorkflowError::Io {
            context: "reading input file",
            source,
        })?
        .len();

    logger.debug(&format!(
        "[Pipeline] {} ({}, {} bytes)",
        filename,
        item.kind.as_str(),
        size_bytes
    ));

    let ticket = api
        .request_upload_ticket(&filename, &mime_type, size_bytes)
        .await?;
    api.upload_bytes(&ticket, &item.input_path, &mime_type).await?;

    let original = api.register_file(&filename, &ticket.object_key).await?;
    let original_id = original.id.clone();
    state.original = Some(original);

    // Model selection is only meaningful for documents; never forwarded
    // for markup.
    let model = match item.kind {
        FileKind::Document => model,
        _ => None,
    };
    let processed_ref = api.trigger_processing(&original_id, model).await?;

    let processed = api.fetch_record(&processed_ref.processed_file_id).await?;
    let processed_id = processed.id.clone();
    state.processed = Some(processed);

    let download = api
        .request_download_ticket(&processed_id, DEFAULT_DOWNLOAD_TTL_SECS)
        .await?;
    api.download_bytes(&download, &item.output_path).await?;

    Ok(())
}
