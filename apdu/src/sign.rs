// Copyright (c) 2023 The X1 Card Developers

//! ECDSA signing APDUs
//!
//! The card signs caller data with its identity key to prove authenticity.
//! Signing runs over the plain channel; the signature is returned as a
//! [TlvResp](crate::data::TlvResp) holding a DER encoded signature.

use encdec::Encode;

use super::{ApduError, ApduStatic, Instruction};
use crate::helpers::tlv;

/// Maximum DER encoded ECDSA signature length
pub const ECDSA_SIGNATURE_SIZE: usize = 72;

/// Maximum length of data to be signed
pub const MAX_SIGN_DATA: usize = 128;

/// Tag wrapping the data to be signed
pub const TAG_SIGN_DATA: u8 = 0xE0;

/// ECDSA sign request
///
/// ## Encoding
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | TAG_SIGN_DATA |      LEN      |           DATA ...            /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EcdsaReq<'a> {
    pub data: &'a [u8],
}

impl<'a> EcdsaReq<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> ApduStatic for EcdsaReq<'a> {
    const INS: u8 = Instruction::Ecdsa as u8;
}

impl<'a> Encode for EcdsaReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.data.is_empty() || self.data.len() > MAX_SIGN_DATA {
            return Err(ApduError::InvalidLength);
        }
        Ok(2 + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        self.encode_len()?;
        tlv::enc(TAG_SIGN_DATA, self.data, buff)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ApduReq;

    #[test]
    fn ecdsa_command() {
        let mut buff = [0u8; 64];
        let n = EcdsaReq::new(&[1, 2, 3]).encode_command(&mut buff).unwrap();

        assert_eq!(
            &buff[..n],
            &[0x00, 0xC5, 0x00, 0x00, 0x05, TAG_SIGN_DATA, 0x03, 1, 2, 3]
        );
    }

    #[test]
    fn ecdsa_empty() {
        let mut buff = [0u8; 64];
        assert_eq!(
            EcdsaReq::new(&[]).encode_command(&mut buff),
            Err(ApduError::InvalidLength)
        );
    }
}
