//! Per-operation failure counting with a give-up threshold.

use std::collections::HashMap;

/// Counts failed attempts per operation key for one session.
///
/// Never persisted; a new session starts with every count at zero.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    max_retries: u32,
    attempts: HashMap<String, u32>,
}

impl RetryTracker {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempts: HashMap::new(),
        }
    }

    /// True while fewer than `max_retries` failures have been recorded for `key`.
    pub fn should_retry(&self, key: &str) -> bool {
        self.attempts(key) < self.max_retries
    }

    /// Records one failure for `key` and returns the new count.
    pub fn record_attempt(&mut self, key: &str) -> u32 {
        let count = self.attempts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn attempts(&self, key: &str) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
