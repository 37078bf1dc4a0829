//! Bounded retries for idempotent service calls
//!
//! Transient failures are retried up to `max_retries` times. A quota failure
//! gets a single retry after `quota_delay`. Everything else, and the last
//! failure once the budget is spent, is returned unchanged.

use crate::config::{DiagnosticSink, SyncConfig};
use crate::service::{ServiceErrorKind, ServiceResult};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
    quota_delay: Duration,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            delay: config.retry_delay,
            quota_delay: config.quota_retry_delay,
            diagnostics: Arc::clone(&config.diagnostics),
        }
    }

    /// Call `op` until it succeeds or the failure is not worth retrying
    pub fn run<T, F>(&self, description: &str, mut op: F) -> ServiceResult<T>
    where
        F: FnMut() -> ServiceResult<T>,
    {
        let mut attempt = 0u32;
        let mut waited_for_quota = false;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.kind == ServiceErrorKind::QuotaExceeded && !waited_for_quota => {
                    waited_for_quota = true;
                    self.diagnostics.notice(&format!(
                        "{}: quota exhausted, retrying once in {:?}",
                        description, self.quota_delay
                    ));
                    thread::sleep(self.quota_delay);
                }
                Err(err)
                    if err.kind == ServiceErrorKind::Transient && attempt < self.max_retries =>
                {
                    attempt += 1;
                    log::debug!(
                        "{} failed ({}), retry {}/{}",
                        description,
                        err.message,
                        attempt,
                        self.max_retries
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use std::cell::Cell;

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy::from_config(
            &SyncConfig::new()
                .with_max_retries(retries)
                .with_quota_retry_delay(Duration::ZERO),
        )
    }

    #[test]
    fn test_transient_then_success() {
        let calls = Cell::new(0);
        let result = policy(3).run("read", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(ServiceError::transient("timeout"))
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_last_error_returned_unchanged() {
        let calls = Cell::new(0);
        let result: ServiceResult<()> = policy(3).run("read", || {
            calls.set(calls.get() + 1);
            Err(ServiceError::transient(format!("attempt {}", calls.get())))
        });
        assert_eq!(calls.get(), 4);
        assert_eq!(result.unwrap_err(), ServiceError::transient("attempt 4"));
    }

    #[test]
    fn test_fatal_not_retried() {
        let calls = Cell::new(0);
        let result: ServiceResult<()> = policy(3).run("write", || {
            calls.set(calls.get() + 1);
            Err(ServiceError::fatal("bad request"))
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(result.unwrap_err().kind, ServiceErrorKind::Fatal);
    }

    #[test]
    fn test_quota_single_retry() {
        let calls = Cell::new(0);
        let result: ServiceResult<()> = policy(0).run("metadata", || {
            calls.set(calls.get() + 1);
            Err(ServiceError::quota("RESOURCE_EXHAUSTED"))
        });
        assert_eq!(calls.get(), 2);
        assert_eq!(result.unwrap_err().kind, ServiceErrorKind::QuotaExceeded);
    }
}
