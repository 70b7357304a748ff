// Copyright (c) 2023 The X1 Card Developers

//! Reader error classification

use super::HalError;
use crate::consts::MAX_RETRIES;

/// Outcome of a reader error classification
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Retry {
    /// Repeat the current frame
    Again,
    /// Abort the exchange
    Fail,
}

/// Retry counter, scoped to a single exchange
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RetryState {
    count: u8,
    limit: u8,
}

impl RetryState {
    /// Create a retry counter permitting up to `limit` retries
    pub const fn new(limit: u8) -> Self {
        Self { count: 0, limit }
    }

    /// Reset counter at the start of an exchange
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Retries consumed so far
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Classify a reader error, consuming a retry
    pub fn classify(&mut self, e: HalError) -> Retry {
        self.count = self.count.saturating_add(1);

        if self.count > self.limit {
            #[cfg(feature = "log")]
            log::error!(
                "reader error {} (0x{:02x}), retries exhausted ({}/{})",
                e,
                u8::from(e),
                self.count,
                self.limit
            );
            return Retry::Fail;
        }

        if !e.is_transient() {
            #[cfg(feature = "log")]
            log::error!(
                "reader error {} (0x{:02x}), not retried ({}/{})",
                e,
                u8::from(e),
                self.count,
                self.limit
            );
            return Retry::Fail;
        }

        #[cfg(feature = "log")]
        log::warn!(
            "reader error {} (0x{:02x}), retrying ({}/{})",
            e,
            u8::from(e),
            self.count,
            self.limit
        );

        Retry::Again
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(MAX_RETRIES)
    }
}
