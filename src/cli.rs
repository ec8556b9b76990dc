//! CLI surface and top-level run orchestration.
//!
//! Parses flags, validates preconditions (input exists, outputs are
//! writable, no collisions), then hands the work items to the batch
//! scheduler. Exit policy: zero only when every item succeeded.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use crate::api::types::ProcessingModel;
use crate::api::{ApiClient, WorkflowApi};
use crate::batch;
use crate::classify::{self, ExpandedInput};
use crate::config::{self, RunConfig};
use crate::error::PreconditionError;
use crate::logger::{BatchLogger, TracingLogger};
use crate::pipeline::WorkItem;
use crate::report::{self, BatchReport};

#[derive(Parser)]
#[command(name = "accessly", version, about = "Batch document accessibility processing")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run files through the accessibility workflow
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input file or directory (directories expand one level deep)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file (single-file input) or output directory (directory input)
    #[arg(short, long)]
    pub output: PathBuf,

    /// API key; falls back to the ACCESSLY_API_KEY environment variable
    #[arg(long)]
    pub api_key: Option<String>,

    /// Base URL of the accessibility API
    #[arg(long, default_value = config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Concurrent pipelines per wave (1-10)
    #[arg(short, long, default_value_t = config::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Processing model (documents only)
    #[arg(long, value_enum)]
    pub model: Option<ProcessingModel>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Run the subcommand to completion and map the result to an exit code.
/// Any per-item failure, like any precondition failure, exits non-zero.
pub async fn run(args: RunArgs) -> i32 {
    match execute(args).await {
        Ok(report) => {
            if report.all_succeeded() {
                0
            } else {
                1
            }
        }
        Err(err) => {
            tracing::error!("{}", err);
            eprintln!("error: {}", err);
            1
        }
    }
}

async fn execute(args: RunArgs) -> Result<BatchReport, PreconditionError> {
    let config = RunConfig::from_args(&args)?;
    let items = build_work_items(&config).await?;

    batch::check_output_collisions(&items)?;
    if !config.force {
        for item in &items {
            if tokio::fs::try_exists(&item.output_path)
                .await
                .unwrap_or(false)
            {
                return Err(PreconditionError::OutputExists(item.output_path.clone()));
            }
        }
    }

    let api: Arc<dyn WorkflowApi> =
        Arc::new(ApiClient::new(config.base_url.as_str(), config.api_key.as_str())?);
    let logger: Arc<dyn BatchLogger> = Arc::new(TracingLogger);

    logger.info(&format!(
        "[Run] {} item(s), concurrency {}",
        items.len(),
        config.concurrency
    ));

    let started = Instant::now();
    let outcomes = batch::run_batch(
        api,
        Arc::clone(&logger),
        items,
        config.concurrency,
        config.model,
    )
    .await;

    let report = BatchReport::from_outcomes(outcomes, started);
    report::render_summary(&report, logger.as_ref());
    Ok(report)
}

/// Expand the input path into work items, mapping each input to its
/// output path. Directory inputs mirror filenames into the output
/// directory; single-file inputs treat --output as the literal file path.
async fn build_work_items(config: &RunConfig) -> Result<Vec<WorkItem>, PreconditionError> {
    let items = match classify::expand_input(&config.input).await? {
        ExpandedInput::File(file) => vec![WorkItem {
            input_path: file.path,
            output_path: config.output.clone(),
            kind: file.kind,
        }],
        ExpandedInput::Directory(files) => files
            .into_iter()
            .map(|file| {
                let filename = file
                    .path
                    .file_name()
                    .map(|n| n.to_os_string())
                    .unwrap_or_default();
                WorkItem {
                    output_path: config.output.join(filename),
                    kind: file.kind,
                    input_path: file.path,
                }
            })
            .collect(),
    };
    Ok(items)
}
