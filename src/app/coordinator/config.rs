//! Configuration structures for the fetch coordinator
//!
//! This module defines the retry policy applied by every fetch task: how long
//! to wait between cross-process lock attempts and how many download cycles
//! an artifact gets before it is reported as corrupt.

use std::time::Duration;

use crate::constants::{fetch, lock};

/// Configuration for the fetch coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Delay between cross-process lock attempts
    pub lock_retry_interval: Duration,
    /// Download → verify cycles per artifact
    pub max_attempts: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_retry_interval: lock::RETRY_INTERVAL,
            max_attempts: fetch::MAX_ATTEMPTS,
        }
    }
}

impl CoordinatorConfig {
    /// Set the lock retry interval
    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    /// Set the number of download cycles per artifact
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_retry_interval.is_zero() {
            return Err("Lock retry interval cannot be zero".to_string());
        }

        if self.max_attempts == 0 {
            return Err("At least one download attempt is required".to_string());
        }

        Ok(())
    }
}
