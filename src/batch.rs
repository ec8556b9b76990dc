//! Wave-based batch scheduler.
//!
//! Partitions work items into consecutive waves of at most the configured
//! concurrency. Every pipeline in a wave reaches a terminal state before
//! the next wave starts; a slow or failing item delays its wave but never
//! cancels its siblings, and no failure aborts the batch.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::api::types::ProcessingModel;
use crate::api::WorkflowApi;
use crate::error::PreconditionError;
use crate::logger::BatchLogger;
use crate::pipeline::{self, PipelineOutcome, WorkItem};

/// Reject duplicate output paths before scheduling. Concurrent pipelines
/// must never target the same output file within one invocation.
pub fn check_output_collisions(items: &[WorkItem]) -> Result<(), PreconditionError> {
    let mut seen: HashSet<&PathBuf> = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(&item.output_path) {
            return Err(PreconditionError::DuplicateOutput(item.output_path.clone()));
        }
    }
    Ok(())
}

/// Run all items through the pipeline in strict waves of `concurrency`.
///
/// Returns exactly one outcome per item, in the original input order,
/// regardless of completion order inside each wave.
pub async fn run_batch(
    api: Arc<dyn WorkflowApi>,
    logger: Arc<dyn BatchLogger>,
    items: Vec<WorkItem>,
    concurrency: usize,
    model: Option<ProcessingModel>,
) -> Vec<PipelineOutcome> {
    let total = items.len();
    let wave_count = total.div_ceil(concurrency.max(1));
    let mut outcomes: Vec<Option<PipelineOutcome>> =
        std::iter::repeat_with(|| None).take(total).collect();

    let mut queue = items.into_iter().enumerate();
    let mut wave_id = 0;
    loop {
        let wave: Vec<(usize, WorkItem)> = queue.by_ref().take(concurrency.max(1)).collect();
        if wave.is_empty() {
            break;
        }
        wave_id += 1;
        logger.info(&format!(
            "[Batch] wave {}/{}: {} item(s)",
            wave_id,
            wave_count,
            wave.len()
        ));

        let mut handles: Vec<(usize, PathBuf, JoinHandle<PipelineOutcome>)> =
            Vec::with_capacity(wave.len());
        for (index, item) in wave {
            let api = Arc::clone(&api);
            let logger = Arc::clone(&logger);
            let input_path = item.input_path.clone();
            let handle = tokio::spawn(async move {
                pipeline::run_pipeline(api.as_ref(), logger.as_ref(), &item, model).await
            });
            handles.push((index, input_path, handle));
        }

        // Wave barrier: every pipeline terminates before the next wave.
        let joined = join_all(
            handles
                .into_iter()
                .map(|(index, path, handle)| async move { (index, path, handle.await) }),
        )
        .await;

        for (index, input_path, result) in joined {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    logger.error(&format!(
                        "[Batch] worker task for {} failed: {}",
                        input_path.display(),
                        join_err
                    ));
                    PipelineOutcome {
                        input_path,
                        success: false,
                        original_record: None,
                        processed_record: None,
                        error_message: Some(format!("worker task failed: {}", join_err)),
                    }
                }
            };
            outcomes[index] = Some(outcome);
        }
    }

    outcomes
        .into_iter()
        .map(|slot| slot.expect("every scheduled item yields exactly one outcome"))
        .collect()
}
