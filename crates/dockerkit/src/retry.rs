//! Retry logic with exponential backoff for transient errors.

use crate::types::RetryConfig;
use std::fmt;
use std::thread;

/// Errors that know whether another attempt could succeed.
pub trait Retryable: fmt::Display {
    fn is_retryable(&self) -> bool;
}

impl Retryable for crate::Error {
    fn is_retryable(&self) -> bool {
        crate::Error::is_retryable(self)
    }
}

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Current attempt number (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - Display form of the error that triggered the retry
    /// * `delay` - Time until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &str, delay: std::time::Duration);

    /// Checked before every sleep; returning true stops retrying.
    fn should_abort(&self) -> bool {
        false
    }
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &str, _delay: std::time::Duration) {}
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &str, delay: std::time::Duration) {
        log::warn!(
            "Attempt {}/{} failed: {}. Retrying in {:.1}s...",
            attempt,
            max_attempts,
            error,
            delay.as_secs_f64()
        );
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The last error, after `attempts` tries (or a non-retryable error)
    Failed { error: E, attempts: u32 },
    /// The callback asked to stop before the budget ran out
    Aborted { attempts: u32 },
}

impl<E> RetryError<E> {
    /// The underlying error, if there is one.
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Aborted { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Failed { attempts, .. } | Self::Aborted { attempts } => *attempts,
        }
    }
}

/// Execute an operation with retry logic.
///
/// Retries the operation if it returns a retryable error, using exponential
/// backoff between attempts.
///
/// # Arguments
/// * `config` - Retry configuration
/// * `callback` - Optional callback for retry notifications and aborting
/// * `operation` - The operation to execute
pub fn with_retry<T, E, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> std::result::Result<T, RetryError<E>>
where
    E: Retryable,
    F: FnMut() -> std::result::Result<T, E>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 && callback.is_some_and(|cb| cb.should_abort()) {
            return Err(RetryError::Aborted { attempts: attempt });
        }

        let error = match operation() {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !error.is_retryable() || attempt + 1 >= max_attempts {
            return Err(RetryError::Failed {
                error,
                attempts: attempt + 1,
            });
        }

        let delay = config.delay_for_attempt(attempt);
        if let Some(cb) = callback {
            cb.on_retry(attempt + 1, max_attempts, &error.to_string(), delay);
            if cb.should_abort() {
                return Err(RetryError::Aborted {
                    attempts: attempt + 1,
                });
            }
        }

        thread::sleep(delay);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        }
    }

    fn network_error() -> Error {
        Error::Network {
            message: "timeout".to_string(),
        }
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let config = RetryConfig::no_retry();
        let result = with_retry(&config, None, || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_non_retryable_error() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: std::result::Result<(), _> = with_retry(&fast_config(5), None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(Error::NotFound {
                name: "foo".to_string(),
            })
        });

        assert!(matches!(result, Err(RetryError::Failed { attempts: 1, .. })));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry(&fast_config(3), None, || {
            let current = attempts_clone.get();
            attempts_clone.set(current + 1);
            if current < 2 { Err(network_error()) } else { Ok(42) }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_all_attempts_fail() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: std::result::Result<(), _> = with_retry(&fast_config(3), None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(network_error())
        });

        let err = result.unwrap_err();
        assert_eq!(err.attempts(), 3);
        assert!(err.into_error().is_some());
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_callback_invoked_between_attempts() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingCallback(Arc<AtomicU32>);
        impl RetryCallback for CountingCallback {
            fn on_retry(&self, _: u32, _: u32, _: &str, _: Duration) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let callback_count = Arc::new(AtomicU32::new(0));
        let callback = CountingCallback(callback_count.clone());

        let _: std::result::Result<(), _> =
            with_retry(&fast_config(3), Some(&callback), || Err(network_error()));

        // Not called after the first or the last attempt
        assert_eq!(callback_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_abort_stops_retrying() {
        struct AbortingCallback;
        impl RetryCallback for AbortingCallback {
            fn on_retry(&self, _: u32, _: u32, _: &str, _: Duration) {}
            fn should_abort(&self) -> bool {
                true
            }
        }

        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: std::result::Result<(), _> =
            with_retry(&fast_config(10), Some(&AbortingCallback), || {
                attempts_clone.set(attempts_clone.get() + 1);
                Err(network_error())
            });

        assert!(matches!(result, Err(RetryError::Aborted { attempts: 1 })));
        assert_eq!(attempts.get(), 1);
    }
}
