// Copyright (c) 2023 The X1 Card Developers

//! Protocol / APDU definitions for X1 card applet communication
//!
//! This module provides the wire objects exchanged between the wallet and the
//! X1 card applet over the contactless link.
//!
//! Commands follow the ISO7816 short form: a 5-byte header (`CLA`, `INS`, `P1`, `P2`, `Lc`)
//! followed by the command body. Responses carry their body followed by a 2-byte
//! big-endian [`StatusWord`].
//!
//! Commands larger than a single contactless frame are split by the engine,
//! which rewrites `CLA` with a chain tag and `Lc` with the per-frame length,
//! so the `Lc` written here only describes the command as a whole.
//!

#![no_std]

use core::fmt::Debug;

use encdec::Encode;
use num_enum::TryFromPrimitive;
use strum::Display;

pub mod card;
pub mod challenge;
pub mod data;
pub mod inheritance;
pub mod pair;
pub mod prelude;
pub mod sign;
pub mod status;
pub mod wallet;

mod helpers;

pub use status::StatusWord;

/// ISO7816 interindustry class byte
pub const CLA_ISO7816: u8 = 0x00;

/// Offset of the class byte
pub const OFFSET_CLA: usize = 0;
/// Offset of the instruction byte
pub const OFFSET_INS: usize = 1;
/// Offset of the first parameter byte
pub const OFFSET_P1: usize = 2;
/// Offset of the second parameter byte
pub const OFFSET_P2: usize = 3;
/// Offset of the declared body length
pub const OFFSET_LC: usize = 4;
/// Offset of the command body (and length of the command header)
pub const OFFSET_CDATA: usize = 5;

/// Maximum length of a full command (header and body) before fragmentation
pub const MAX_COMMAND_LEN: usize = 600;

/// Card applet instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Pair device with card
    Pair = 0x12,

    /// Remove device pairing
    Unpair = 0x13,

    /// Store a wallet share on the card
    AddWallet = 0xC1,

    /// Fetch a stored wallet share
    RetrieveWallet = 0xC3,

    /// Remove a stored wallet share
    DeleteWallet = 0xC4,

    /// Sign a digest with the card identity key
    Ecdsa = 0xC5,

    /// List wallets stored on the card
    ListWallet = 0xC6,

    /// Fetch a proof-of-work challenge for a locked wallet
    GetChallenge = 0xC7,

    /// Submit a proof-of-work challenge solution
    VerifyChallenge = 0xC8,

    /// Inheritance data encryption / decryption
    Inheritance = 0xC9,

    /// Request the next chunk of a chained response
    GetResponse = 0xCF,

    /// ISO7816 SELECT
    Select = 0xA4,
}

/// APDU encode / decode errors
#[derive(Copy, Clone, Debug, PartialEq, Display)]
pub enum ApduError {
    /// Buffer too short or field length out of range
    InvalidLength,

    /// Field value not valid for this type
    InvalidEncoding,

    /// Invalid UTF8 string
    Utf8,
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            _ => ApduError::InvalidEncoding,
        }
    }
}

/// Static header information for command APDUs
pub trait ApduStatic {
    /// Class byte
    const CLA: u8 = CLA_ISO7816;

    /// Instruction byte
    const INS: u8;

    /// First parameter, defaults to zero
    fn p1(&self) -> u8 {
        0
    }

    /// Second parameter, defaults to zero
    fn p2(&self) -> u8 {
        0
    }
}

/// Command APDU, combining static header information with a body encoding
pub trait ApduReq: ApduStatic + Encode<Error = ApduError> + Debug {
    /// Write the command header and body to the provided buffer,
    /// returning the total command length
    fn encode_command(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let body_len = self.encode_len()?;
        let n = OFFSET_CDATA + body_len;

        if n > MAX_COMMAND_LEN || buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[OFFSET_CLA] = Self::CLA;
        buff[OFFSET_INS] = Self::INS;
        buff[OFFSET_P1] = self.p1();
        buff[OFFSET_P2] = self.p2();
        // Bodies over 255 bytes are chained, frames carry their own length
        buff[OFFSET_LC] = body_len as u8;

        let written = self.encode(&mut buff[OFFSET_CDATA..n])?;
        if written != body_len {
            return Err(ApduError::InvalidLength);
        }

        Ok(n)
    }
}

impl<T: ApduStatic + Encode<Error = ApduError> + Debug> ApduReq for T {}

/// Helper macro for encoding `bitflags` types
#[macro_export]
macro_rules! encdec_bitflags {
    ($b:ty) => {
        impl encdec::Encode for $b {
            type Error = ApduError;

            fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
                let bits: u8 = self.bits();
                encdec::Encode::encode(&bits, buff).map_err(|e| e.into())
            }

            fn encode_len(&self) -> Result<usize, Self::Error> {
                let bits: u8 = self.bits();
                encdec::Encode::encode_len(&bits).map_err(|e| e.into())
            }
        }

        impl encdec::DecodeOwned for $b {
            type Output = $b;
            type Error = ApduError;

            fn decode_owned(buff: &[u8]) -> Result<(Self, usize), Self::Error> {
                if buff.is_empty() {
                    return Err(ApduError::InvalidLength);
                }
                let v = <$b>::from_bits_truncate(buff[0]);
                Ok((v, 1))
            }
        }
    };
}
