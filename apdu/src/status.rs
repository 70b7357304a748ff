// Copyright (c) 2023 The X1 Card Developers

//! ISO7816 status words
//!
//! Every response APDU ends with a 2-byte big-endian status word.
//! `0x9000` indicates success, `0x61XX` indicates `XX` more bytes
//! are available via [`ContinuationReq`], anything else is an
//! applet-defined failure.

use byteorder::{BigEndian, ByteOrder};

use crate::{Instruction, CLA_ISO7816};

/// Length of the status word trailer
pub const STATUS_LEN: usize = 2;

/// High byte signalling more response data is available
pub const SW1_MORE_DATA: u8 = 0x61;

/// Response status word
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// Command completed successfully
    pub const NO_ERROR: Self = Self(0x9000);

    /// Wrong command length
    pub const WRONG_LENGTH: Self = Self(0x6700);

    /// Security status not satisfied (ie. pairing missing)
    pub const SECURITY_STATUS_NOT_SATISFIED: Self = Self(0x6982);

    /// File invalid, reported for a card family mismatch
    pub const FILE_INVALID: Self = Self(0x6983);

    /// Conditions of use not satisfied, reported for an unexpected card number
    pub const CONDITIONS_NOT_SATISFIED: Self = Self(0x6985);

    /// Incorrect parameters in the command body
    pub const WRONG_DATA: Self = Self(0x6A80);

    /// Applet version is not supported by this device
    pub const INCOMPATIBLE_APPLET: Self = Self(0x6A81);

    /// Referenced record not found
    pub const RECORD_NOT_FOUND: Self = Self(0x6A83);

    /// Not enough memory space on the card
    pub const NOT_ENOUGH_MEMORY: Self = Self(0x6A84);

    /// Instruction not supported
    pub const INS_NOT_SUPPORTED: Self = Self(0x6D00);

    /// Class not supported
    pub const CLA_NOT_SUPPORTED: Self = Self(0x6E00);

    /// No precise diagnosis
    pub const UNKNOWN: Self = Self(0x6F00);

    /// Build a status word from its two bytes
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self(((sw1 as u16) << 8) | sw2 as u16)
    }

    /// Read the trailing status word from a response buffer
    pub fn from_trailer(buff: &[u8]) -> Option<Self> {
        if buff.len() < STATUS_LEN {
            return None;
        }

        let sw = BigEndian::read_u16(&buff[buff.len() - STATUS_LEN..]);
        Some(Self(sw))
    }

    /// High status byte
    pub const fn sw1(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Low status byte
    pub const fn sw2(&self) -> u8 {
        self.0 as u8
    }

    /// Big-endian wire encoding
    pub const fn to_bytes(&self) -> [u8; STATUS_LEN] {
        self.0.to_be_bytes()
    }

    /// Check for success
    pub fn is_ok(&self) -> bool {
        *self == Self::NO_ERROR
    }

    /// Check whether more response data must be requested
    pub const fn is_more_data(&self) -> bool {
        self.sw1() == SW1_MORE_DATA
    }

    /// Remaining byte count announced by a `0x61XX` status word
    pub const fn remaining(&self) -> Option<u8> {
        match self.is_more_data() {
            true => Some(self.sw2()),
            false => None,
        }
    }

    fn name(&self) -> Option<&'static str> {
        let n = match *self {
            Self::NO_ERROR => "no error",
            Self::WRONG_LENGTH => "wrong length",
            Self::SECURITY_STATUS_NOT_SATISFIED => "security status not satisfied",
            Self::FILE_INVALID => "file invalid",
            Self::CONDITIONS_NOT_SATISFIED => "conditions not satisfied",
            Self::WRONG_DATA => "wrong data",
            Self::INCOMPATIBLE_APPLET => "incompatible applet",
            Self::RECORD_NOT_FOUND => "record not found",
            Self::NOT_ENOUGH_MEMORY => "not enough memory",
            Self::INS_NOT_SUPPORTED => "instruction not supported",
            Self::CLA_NOT_SUPPORTED => "class not supported",
            Self::UNKNOWN => "unknown",
            _ if self.is_more_data() => "more data",
            _ => return None,
        };
        Some(n)
    }
}

impl From<u16> for StatusWord {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl From<StatusWord> for u16 {
    fn from(sw: StatusWord) -> Self {
        sw.0
    }
}

/// Debug format [StatusWord] as hex
impl core::fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "StatusWord(0x{:04x})", self.0)
    }
}

/// Display [StatusWord] as hex with a name where known
impl core::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(n) => write!(f, "0x{:04x} ({n})", self.0),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}

/// Length of a continuation request
pub const CONTINUATION_LEN: usize = 4;

/// Request for the next chunk of a chained response (`00 CF XX 00`)
///
/// `index` is the 1-based chunk number the card should return next.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ContinuationReq {
    pub index: u8,
}

impl ContinuationReq {
    /// Create a continuation request for the provided chunk index
    pub const fn new(index: u8) -> Self {
        Self { index }
    }

    /// Fixed 4-byte wire encoding
    pub const fn to_bytes(&self) -> [u8; CONTINUATION_LEN] {
        [
            CLA_ISO7816,
            Instruction::GetResponse as u8,
            self.index,
            0x00,
        ]
    }
}
