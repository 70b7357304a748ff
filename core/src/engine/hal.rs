// Copyright (c) 2023 The X1 Card Developers

//! Platform interfaces for the [Engine][super::Engine]

use num_enum::{FromPrimitive, IntoPrimitive};
use strum::{Display, EnumIter};

/// Contactless reader (PN532) error codes
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, FromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum HalError {
    /// Target did not respond in time
    Timeout = 0x01,
    /// CRC error on the RF link
    Crc = 0x02,
    /// Parity error
    Parity = 0x03,
    /// Erroneous bit count during anti-collision
    BitCount = 0x04,
    /// Framing error
    Framing = 0x05,
    /// Abnormal bit collision
    Collision = 0x06,
    /// Communication buffer size insufficient
    BufferSize = 0x07,
    /// RF buffer overflow
    BufferOverflow = 0x09,
    /// RF field not switched on in time
    TimeMismatch = 0x0A,
    /// RF protocol error
    RfProtocol = 0x0B,
    /// Antenna driver overheating
    Temperature = 0x0D,
    /// Internal buffer overflow
    InternalBufferOverflow = 0x0E,
    /// Invalid command parameter
    InvalidParameter = 0x10,
    /// DEP protocol error
    DepProtocol = 0x12,
    /// Data format mismatch
    DataFormat = 0x13,
    /// Mifare authentication error
    Authentication = 0x14,
    /// UID check byte wrong
    UidCheckByte = 0x23,
    /// Invalid DEP device state
    DepInvalidState = 0x25,
    /// Operation not allowed in this configuration
    OperationNotAllowed = 0x26,
    /// Command not acceptable in the current context
    CommandUnacceptable = 0x27,
    /// Target released by the initiator
    TargetReleased = 0x29,
    /// Card ID mismatch
    CardIdMismatch = 0x2A,
    /// Card disappeared from the field
    CardDisappeared = 0x2B,
    /// NFCID3 mismatch
    TargetMismatch = 0x2C,
    /// Over-current detected
    OverCurrent = 0x2D,
    /// NAD missing in DEP frame
    NadMissing = 0x2E,
    /// Unclassified error
    #[num_enum(default)]
    Unknown = 0xFF,
}

impl HalError {
    /// Check whether this error is eligible for retry
    pub fn is_transient(&self) -> bool {
        !matches!(self, HalError::Crc | HalError::RfProtocol | HalError::Unknown)
    }
}

/// [`Transport`] trait provides reader access for [`Engine`][super::Engine] instances
pub trait Transport {
    /// Exchange a single frame with the card, writing the response to `resp`
    /// and returning the response length
    fn exchange(&mut self, frame: &[u8], resp: &mut [u8]) -> Result<usize, HalError>;

    /// Attempt to detect a card in the field, waiting up to `timeout_ms`
    /// (`0` for the reader default)
    fn detect_card(&mut self, timeout_ms: u16) -> Result<(), HalError>;

    /// Clear reader receive buffers
    fn clear_buffers(&mut self);
}

impl<T: Transport> Transport for &mut T {
    fn exchange(&mut self, frame: &[u8], resp: &mut [u8]) -> Result<usize, HalError> {
        T::exchange(self, frame, resp)
    }

    fn detect_card(&mut self, timeout_ms: u16) -> Result<(), HalError> {
        T::detect_card(self, timeout_ms)
    }

    fn clear_buffers(&mut self) {
        T::clear_buffers(self)
    }
}

/// [`Hooks`] provide cancellation and cooperative scheduling for long-running waits
pub trait Hooks {
    /// Poll for a pending cancellation
    fn cancelled(&mut self) -> bool {
        false
    }

    /// Forced abort, invoked once a cancellation is observed
    fn abort(&mut self) {}

    /// Yield to other tasks between hardware polls
    fn yield_now(&mut self) {}
}

impl<T: Hooks> Hooks for &mut T {
    fn cancelled(&mut self) -> bool {
        T::cancelled(self)
    }

    fn abort(&mut self) {
        T::abort(self)
    }

    fn yield_now(&mut self) {
        T::yield_now(self)
    }
}

/// Default [Hooks], never cancelled
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct NoHooks;

impl Hooks for NoHooks {}
