pub mod api;
pub mod batch;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod report;

#[cfg(test)]
pub(crate) mod test_util;
