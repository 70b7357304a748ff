// Copyright (c) 2023 The X1 Card Developers

use crate::apdu::{ApduError, StatusWord};

use super::HalError;

/// [Engine][super::Engine] errors
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum Error {
    /// Invalid argument length
    #[cfg_attr(feature = "thiserror", error("Invalid argument length"))]
    InvalidLength,

    /// Command exceeds the maximum command length
    #[cfg_attr(feature = "thiserror", error("command too long"))]
    CommandTooLong,

    /// Response exceeds the response buffer
    #[cfg_attr(feature = "thiserror", error("response too long"))]
    ResponseTooLong,

    /// Reader error, not retried or retries exhausted
    #[cfg_attr(feature = "thiserror", error("transport error: {0}"))]
    Transport(HalError),

    /// Card acknowledgement violated the chaining protocol
    #[cfg_attr(feature = "thiserror", error("protocol desync"))]
    ProtocolDesync,

    /// Response shorter than a status word
    #[cfg_attr(feature = "thiserror", error("malformed response"))]
    MalformedResponse,

    /// Secure channel encryption failed
    #[cfg_attr(feature = "thiserror", error("encryption failed"))]
    Encryption,

    /// Secure channel authentication / decryption failed
    #[cfg_attr(feature = "thiserror", error("decryption failed"))]
    Decryption,

    /// Secure channel requested without a session key
    #[cfg_attr(feature = "thiserror", error("session key missing"))]
    MissingSessionKey,

    /// Operation cancelled
    #[cfg_attr(feature = "thiserror", error("aborted"))]
    Aborted,

    /// APDU encoding / decoding failed
    #[cfg_attr(feature = "thiserror", error("encoding error: {0}"))]
    Encoding(ApduError),

    /// Card reported a failure status
    #[cfg_attr(feature = "thiserror", error("card status {0}"))]
    Status(StatusWord),

    /// Share counts out of range
    #[cfg_attr(feature = "thiserror", error("invalid share count"))]
    InvalidShareCount,

    /// Wallet record failed validation
    #[cfg_attr(feature = "thiserror", error("invalid wallet"))]
    InvalidWallet,
}

impl From<HalError> for Error {
    fn from(e: HalError) -> Self {
        Self::Transport(e)
    }
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        Self::Encoding(e)
    }
}

impl From<StatusWord> for Error {
    fn from(sw: StatusWord) -> Self {
        Self::Status(sw)
    }
}
