//! Remote workflow client for the accessibility API.

pub mod client;
pub mod types;

pub use client::{ApiClient, WorkflowApi, DEFAULT_DOWNLOAD_TTL_SECS};
