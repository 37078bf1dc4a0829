//! Synchronizer configuration

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default ceiling on cells written per request
pub const DEFAULT_MAX_CELLS_PER_REQUEST: usize = 1_000_000;

/// Default number of retries for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default wait before retrying after a quota error
pub const DEFAULT_QUOTA_RETRY_DELAY: Duration = Duration::from_secs(100);

/// Receiver for non-fatal notices addressed to the caller
pub trait DiagnosticSink: Send + Sync {
    fn notice(&self, message: &str);
}

/// Forwards notices to the `log` facade at warn level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn notice(&self, message: &str) {
        log::warn!("{}", message);
    }
}

/// Synchronizer settings
#[derive(Clone)]
pub struct SyncConfig {
    pub max_cells_per_request: usize,
    pub max_retries: u32,
    /// Pause between transient retries
    pub retry_delay: Duration,
    pub quota_retry_delay: Duration,
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl SyncConfig {
    /// Default limits, no retry pause, diagnostics to the log
    pub fn new() -> Self {
        Self {
            max_cells_per_request: DEFAULT_MAX_CELLS_PER_REQUEST,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::ZERO,
            quota_retry_delay: DEFAULT_QUOTA_RETRY_DELAY,
            diagnostics: Arc::new(LogSink),
        }
    }

    /// Set the per-request cell ceiling (at least 1)
    pub fn with_max_cells_per_request(mut self, cells: usize) -> Self {
        self.max_cells_per_request = cells.max(1);
        self
    }

    /// Set how many times a transient failure is retried
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the pause between transient retries
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the pause before the single retry after a quota failure
    pub fn with_quota_retry_delay(mut self, delay: Duration) -> Self {
        self.quota_retry_delay = delay;
        self
    }

    /// Send user-facing notices to `sink`
    pub fn with_diagnostics<D: DiagnosticSink + 'static>(mut self, sink: D) -> Self {
        self.diagnostics = Arc::new(sink);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("max_cells_per_request", &self.max_cells_per_request)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("quota_retry_delay", &self.quota_retry_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl DiagnosticSink for Arc<Collect> {
        fn notice(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.max_cells_per_request, 1_000_000);
        assert_eq!(config.max_retries, 3);
        assert!(config.retry_delay.is_zero());
        assert_eq!(config.quota_retry_delay, Duration::from_secs(100));
    }

    #[test]
    fn test_builder_and_sink() {
        let collected = Arc::new(Collect::default());
        let config = SyncConfig::new()
            .with_max_cells_per_request(0)
            .with_max_retries(5)
            .with_diagnostics(collected.clone());

        assert_eq!(config.max_cells_per_request, 1);
        assert_eq!(config.max_retries, 5);

        config.diagnostics.notice("hello");
        assert_eq!(*collected.0.lock().unwrap(), vec!["hello".to_string()]);
    }
}
