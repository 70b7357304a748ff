// Copyright (c) 2023 The X1 Card Developers

//! Pairing APDUs
//!
//! Pairing runs over the plain channel and establishes the device key the
//! card will expect on subsequent secure exchanges. The pairing payload is
//! produced and consumed by the provisioning flow and is opaque here.

use encdec::Encode;

use super::{ApduError, ApduStatic, Instruction};

/// Maximum pairing payload
pub const MAX_PAIR_DATA: usize = 255;

/// Pair request, carrying the device pairing payload
#[derive(Copy, Clone, PartialEq)]
pub struct PairReq<'a> {
    pub data: &'a [u8],
}

impl<'a> PairReq<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

/// Debug format [PairReq] with payload elided
impl<'a> core::fmt::Debug for PairReq<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PairReq({} bytes)", self.data.len())
    }
}

impl<'a> ApduStatic for PairReq<'a> {
    const INS: u8 = Instruction::Pair as u8;
}

impl<'a> Encode for PairReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.data.len() > MAX_PAIR_DATA {
            return Err(ApduError::InvalidLength);
        }
        Ok(self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[..n].copy_from_slice(self.data);

        Ok(n)
    }
}

/// Unpair request (`00 13 00 00`), sent over the secure channel
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct UnpairReq {}

impl ApduStatic for UnpairReq {
    const INS: u8 = Instruction::Unpair as u8;
}

impl Encode for UnpairReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}
