// Copyright (c) 2023 The X1 Card Developers

//! Inheritance data APDUs
//!
//! The card encrypts (or decrypts) caller data under a wallet specific key so
//! it may be handed to a beneficiary. Results are returned as a
//! [TlvResp](crate::data::TlvResp).

use encdec::Encode;
use num_enum::TryFromPrimitive;
use strum::Display;

use super::{ApduError, ApduStatic, Instruction};
use crate::{
    helpers::lv,
    wallet::{name_str, NAME_SIZE},
};

/// Maximum inheritance payload
pub const MAX_INHERITANCE_DATA: usize = 255;

/// Inheritance operation, sent as `P1`
#[derive(Copy, Clone, PartialEq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum InheritanceMode {
    Encrypt = 0x01,
    Decrypt = 0x02,
}

/// Inheritance request
///
/// ## Encoding
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                        NAME (16 bytes)                        /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      LEN      |                  DATA ...                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq)]
pub struct InheritanceReq<'a> {
    pub mode: InheritanceMode,
    pub name: [u8; NAME_SIZE],
    pub data: &'a [u8],
}

impl<'a> InheritanceReq<'a> {
    /// Request encryption of plaintext data
    pub fn encrypt(name: [u8; NAME_SIZE], data: &'a [u8]) -> Self {
        Self {
            mode: InheritanceMode::Encrypt,
            name,
            data,
        }
    }

    /// Request decryption of previously encrypted data
    pub fn decrypt(name: [u8; NAME_SIZE], data: &'a [u8]) -> Self {
        Self {
            mode: InheritanceMode::Decrypt,
            name,
            data,
        }
    }
}

/// Debug format [InheritanceReq] with data elided
impl<'a> core::fmt::Debug for InheritanceReq<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InheritanceReq")
            .field("mode", &self.mode)
            .field("name", &name_str(&self.name).unwrap_or("<invalid>"))
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl<'a> ApduStatic for InheritanceReq<'a> {
    const INS: u8 = Instruction::Inheritance as u8;

    fn p1(&self) -> u8 {
        self.mode as u8
    }
}

impl<'a> Encode for InheritanceReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.data.is_empty() || self.data.len() > MAX_INHERITANCE_DATA {
            return Err(ApduError::InvalidLength);
        }
        Ok(NAME_SIZE + 1 + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[..NAME_SIZE].copy_from_slice(&self.name);
        let index = NAME_SIZE + lv::enc(self.data, &mut buff[NAME_SIZE..])?;

        Ok(index)
    }
}
