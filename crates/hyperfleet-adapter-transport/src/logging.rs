//! Adapts the process-wide `tracing` logger to the five-level leveled-logger
//! contract the Maestro client library expects: `Debug/Info/Warn/Error/Fatal`,
//! each a context-plus-message call. `Fatal` is forwarded as `Error` with a
//! "FATAL:" prefix rather than terminating the process, this adapter never calls
//! `std::process::exit`.

pub trait LeveledLog: Send + Sync {
    fn debug(&self, context: &str, message: &str);
    fn info(&self, context: &str, message: &str);
    fn warn(&self, context: &str, message: &str);
    fn error(&self, context: &str, message: &str);
    fn fatal(&self, context: &str, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLeveledLogger;

impl LeveledLog for TracingLeveledLogger {
    fn debug(&self, context: &str, message: &str) {
        tracing::debug!(target: "maestro", context, message);
    }

    fn info(&self, context: &str, message: &str) {
        tracing::info!(target: "maestro", context, message);
    }

    fn warn(&self, context: &str, message: &str) {
        tracing::warn!(target: "maestro", context, message);
    }

    fn error(&self, context: &str, message: &str) {
        tracing::error!(target: "maestro", context, message);
    }

    fn fatal(&self, context: &str, message: &str) {
        tracing::error!(target: "maestro", context, message = %format!("FATAL: {message}"));
    }
}
