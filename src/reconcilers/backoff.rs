// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-object exponential backoff for the controller error policy.
//!
//! Stages never retry locally; a failed pass is handed to the error policy, which asks
//! [`ErrorBackoff`] how long to wait before the next attempt for that object.
//!
//! # Retry Schedule
//!
//! With the default settings, consecutive failures of the same object requeue after:
//!
//! 1. 1s
//! 2. 2s
//! 3. 4s
//! 4. 8s
//! 5. ...
//! 6. 300s (capped at max interval)
//!
//! A successful pass resets the schedule for that object.

use crate::constants::{ERROR_BACKOFF_INITIAL_SECS, ERROR_BACKOFF_MAX_SECS};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: u32 = 2;

/// Failure counts keyed by object, shared by every reconcile.
#[derive(Debug)]
pub struct ErrorBackoff {
    /// Delay after the first failure
    pub initial_interval: Duration,
    /// Upper bound on any single delay
    pub max_interval: Duration,
    failures: Mutex<HashMap<String, u32>>,
}

impl Default for ErrorBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(ERROR_BACKOFF_INITIAL_SECS),
            Duration::from_secs(ERROR_BACKOFF_MAX_SECS),
        )
    }
}

impl ErrorBackoff {
    /// Create a tracker with the given bounds.
    #[must_use]
    pub fn new(initial_interval: Duration, max_interval: Duration) -> Self {
        Self {
            initial_interval,
            max_interval,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `key` and return the delay before the next attempt.
    pub fn next_backoff(&self, key: &str) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(key.to_string()).or_insert(0);
        let delay = self.delay_for(*count);
        *count = count.saturating_add(1);
        delay
    }

    /// Forget past failures for `key`.
    pub fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of consecutive failures currently recorded for `key`.
    #[must_use]
    pub fn failures(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn delay_for(&self, previous_failures: u32) -> Duration {
        BACKOFF_MULTIPLIER
            .checked_pow(previous_failures)
            .and_then(|factor| self.initial_interval.checked_mul(factor))
            .map_or(self.max_interval, |delay| delay.min(self.max_interval))
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod backoff_tests;
