use std::sync::Arc;

/// Destination for recoverable-condition notices: missing source content,
/// unreadable map files. Stages hold one of these and default to `NopSink`,
/// so recovery is silent unless a host opts in.
pub trait DiagnosticSink: Send + Sync {
    fn note(&self, message: &str);
}

/// Drops every notice.
pub struct NopSink;

impl DiagnosticSink for NopSink {
    fn note(&self, _message: &str) {}
}

/// Forwards notices to the `log` facade at debug level.
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn note(&self, message: &str) {
        log::debug!("{message}");
    }
}

pub(crate) fn default_sink() -> Arc<dyn DiagnosticSink> {
    Arc::new(NopSink)
}
