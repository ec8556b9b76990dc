//! Logger capability handed to the scheduler and pipeline.
//!
//! The batch engine logs through an explicit interface instead of a global
//! singleton, so callers decide where output goes (tests pass a silent or
//! recording impl; the CLI passes the tracing-backed one).

pub trait BatchLogger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    /// End-of-run summary lines; printed to stdout regardless of verbosity
    fn summary(&self, message: &str);
}

/// Production logger forwarding to `tracing`.
pub struct TracingLogger;

impl BatchLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn summary(&self, message: &str) {
        println!("{}", message);
    }
}

/// Logger that drops everything. Used by tests that only care about
/// outcomes.
pub struct NullLogger;

impl BatchLogger for NullLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn summary(&self, _message: &str) {}
}
