// Copyright (c) 2023 The X1 Card Developers

use crate::consts::MAX_RETRIES;

/// [Engine][super::Engine] configuration
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Retries permitted per exchange for transient reader errors
    pub max_retries: u8,

    /// Card detection timeout per poll in milliseconds (`0` for the reader default)
    pub card_poll_timeout_ms: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            card_poll_timeout_ms: 0,
        }
    }
}
