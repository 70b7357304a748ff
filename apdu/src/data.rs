// Copyright (c) 2023 The X1 Card Developers

//! Variable length response payloads
//!
//! Responses returning caller data (signatures, inheritance blobs) wrap it
//! as `TAG || LEN || VALUE`.

use encdec::{Decode, Encode};

use super::ApduError;
use crate::helpers::tlv;

/// Tag-length-value response, borrowing the value from the response buffer
#[derive(Copy, Clone, PartialEq)]
pub struct TlvResp<'a> {
    /// Applet-defined tag
    pub tag: u8,

    /// Response value
    pub value: &'a [u8],
}

/// Debug format [TlvResp] with value elided (may hold decrypted data)
impl<'a> core::fmt::Debug for TlvResp<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "TlvResp(0x{:02x}, {} bytes)", self.tag, self.value.len())
    }
}

impl<'a> TlvResp<'a> {
    pub fn new(tag: u8, value: &'a [u8]) -> Self {
        Self { tag, value }
    }
}

impl<'a> Encode for TlvResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.value.len() > u8::MAX as usize {
            return Err(ApduError::InvalidLength);
        }
        Ok(2 + self.value.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        tlv::enc(self.tag, self.value, buff)
    }
}

impl<'a> Decode<'a> for TlvResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        let (tag, value, n) = tlv::dec(buff)?;
        Ok((Self { tag, value }, n))
    }
}
