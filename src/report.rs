//! Batch report aggregation.
//!
//! Pure reduction of per-item outcomes into counts and elapsed time. The
//! CLI layer decides when and where the summary is rendered.

use std::time::{Duration, Instant};

use crate::logger::BatchLogger;
use crate::pipeline::PipelineOutcome;

/// Final read-only summary of one batch invocation.
#[derive(Debug)]
pub struct BatchReport {
    pub total_items: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<PipelineOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<PipelineOutcome>, started: Instant) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;
        Self {
            total_items: outcomes.len(),
            succeeded,
            failed,
            outcomes,
            elapsed: started.elapsed(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// A batch where nothing succeeded is reported distinctly from a
    /// mixed result.
    pub fn none_succeeded(&self) -> bool {
        self.succeeded == 0 && self.total_items > 0
    }
}

/// Render the human-readable summary through the logger capability.
pub fn render_summary(report: &BatchReport, logger: &dyn BatchLogger) {
    logger.summary(&format!(
        "Processed {} file(s) in {:.1}s: {} succeeded, {} failed",
        report.total_items,
        report.elapsed.as_secs_f64(),
        report.succeeded,
        report.failed
    ));

    for outcome in report.outcomes.iter().filter(|o| !o.success) {
        logger.summary(&format!(
            "  FAILED {}: {}",
            outcome.input_path.display(),
            outcome.error_message.as_deref().unwrap_or("unknown error")
        ));
    }

    if report.none_succeeded() {
        logger.summary("No files were processed successfully.");
    }
}
