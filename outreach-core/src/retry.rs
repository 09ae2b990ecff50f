use crate::{CoreError, ErrorExt, LlmError, SourceError, StoreError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000, // 1 second
            max_delay_ms: 30000, // 30 seconds
            backoff_multiplier: 2.0,
            jitter_factor: 0.1, // 10% jitter
        }
    }
}

impl RetryConfig {
    /// Retry config for document store writes: 1s, 2s, then give up
    pub fn persistence(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Retry after the delay the remote asked for
    RetryWithDelay(Duration),
    /// Don't retry (for permanent failures)
    NoRetry,
}

/// Determine retry strategy based on error type
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error {
        CoreError::Store(StoreError::RateLimitExceeded { retry_after })
        | CoreError::Source(SourceError::RateLimitExceeded { retry_after, .. })
        | CoreError::Llm(LlmError::RateLimitExceeded { retry_after, .. }) => {
            RetryStrategy::RetryWithDelay(Duration::from_secs(*retry_after))
        }
        _ if error.is_credential_error() => RetryStrategy::NoRetry,
        _ if error.is_retryable() => RetryStrategy::Retry,
        _ => RetryStrategy::NoRetry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = Duration::from_millis(config.base_delay_ms);
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let exponential_delay = if attempt == 0 {
        base_delay
    } else {
        let multiplier = config.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms.min(config.max_delay_ms))
    };

    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);
    let final_delay = exponential_delay + Duration::from_millis(jitter);

    final_delay.min(max_delay)
}

/// Retry metrics for monitoring
#[derive(Debug, Clone, Default)]
pub struct RetryMetrics {
    pub total_retries: u64,
    pub successful_retries: u64,
    pub failed_operations: u64,
}

/// Retry executor that wraps operations with retry logic
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    metrics: Arc<Mutex<RetryMetrics>>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(Mutex::new(RetryMetrics::default())),
        }
    }

    /// Execute an operation with retry logic. The error of the last attempt is
    /// returned unchanged so callers can still classify it.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        let mut metrics = self.lock_metrics();
                        metrics.total_retries += attempt as u64;
                        metrics.successful_retries += 1;
                        info!(
                            "Operation {} succeeded after {} retries",
                            operation_name, attempt
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    let has_attempts_left = attempt + 1 < self.config.max_attempts;
                    let delay = match get_retry_strategy(&error) {
                        RetryStrategy::Retry if has_attempts_left => {
                            Some(calculate_delay(attempt, &self.config))
                        }
                        RetryStrategy::RetryWithDelay(delay) if has_attempts_left => {
                            Some(delay.min(Duration::from_millis(self.config.max_delay_ms)))
                        }
                        _ => None,
                    };

                    match delay {
                        Some(delay) => {
                            info!(
                                "Retrying {} in {:?} (attempt {}/{}) due to: {}",
                                operation_name,
                                delay,
                                attempt + 1,
                                self.config.max_attempts,
                                error
                            );
                            sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            {
                                let mut metrics = self.lock_metrics();
                                metrics.total_retries += attempt as u64;
                                metrics.failed_operations += 1;
                            }
                            if attempt > 0 {
                                error!(
                                    "Operation {} failed after {} attempts: {}",
                                    operation_name,
                                    attempt + 1,
                                    error
                                );
                            } else {
                                debug!("Not retrying {}: {}", operation_name, error);
                            }
                            return Err(error);
                        }
                    }
                }
            }
        }
    }

    /// Get current retry metrics
    pub fn get_metrics(&self) -> RetryMetrics {
        self.lock_metrics().clone()
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, RetryMetrics> {
        // A poisoned counter is still a usable counter
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
