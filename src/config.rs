//! Run configuration, built from CLI flags plus the environment.

use std::env;
use std::path::PathBuf;

use crate::api::types::ProcessingModel;
use crate::cli::RunArgs;
use crate::error::PreconditionError;

/// Environment fallback for the API key (loaded from `.env` via dotenvy).
pub const API_KEY_ENV: &str = "ACCESSLY_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.accessly.dev";

pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Validated configuration for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub api_key: String,
    pub base_url: String,
    /// Pipelines per wave, within [MIN_CONCURRENCY, MAX_CONCURRENCY]
    pub concurrency: usize,
    /// Overwrite existing output files
    pub force: bool,
    /// Processing model; only forwarded for document inputs
    pub model: Option<ProcessingModel>,
}

impl RunConfig {
    /// Validate CLI args into a run configuration. Rejects out-of-range
    /// concurrency and a missing API key before anything is scheduled.
    pub fn from_args(args: &RunArgs) -> Result<Self, PreconditionError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&args.concurrency) {
            return Err(PreconditionError::InvalidConcurrency(args.concurrency));
        }

        let api_key = args
            .api_key
            .clone()
            .or_else(|| env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
            .ok_or(PreconditionError::MissingApiKey(API_KEY_ENV))?;

        Ok(Self {
            input: args.input.clone(),
            output: args.output.clone(),
            api_key,
            base_url: args.base_url.clone(),
            concurrency: args.concurrency,
            force: args.force,
            model: args.model,
        })
    }
}
