//! # Retry Policy
//!
//! Bounded, immediate retries for reasoning-service calls.

use crate::application::error::{EnhancementError, EnhancementResult};
use crate::infrastructure::error::IntegrationResult;
use std::future::Future;
use tracing::warn;

/// Retries a failing call up to a fixed number of attempts, with no delay
/// between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Upper bound on attempts.
    pub const MAX_ATTEMPTS: u32 = 2;

    /// Creates a policy. `max_attempts` is clamped to `1..=MAX_ATTEMPTS`.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, Self::MAX_ATTEMPTS),
        }
    }

    /// Returns the number of attempts.
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `call` until it succeeds or the attempts are exhausted.
    ///
    /// `call` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns `EnhancementError::ReasoningService` carrying the attempt
    /// count and the last failure.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> EnhancementResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = IntegrationResult<T>>,
    {
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match call(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(operation, attempt, max_attempts = self.max_attempts, error = %e, "reasoning call failed");
                    last_error = e.to_string();
                }
            }
        }
        Err(EnhancementError::reasoning_service(self.max_attempts, last_error))
    }
}
