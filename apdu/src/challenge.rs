// Copyright (c) 2023 The X1 Card Developers

//! Proof-of-work challenge APDUs
//!
//! A wallet locked after repeated password failures is unlocked by fetching a
//! challenge from the card, solving it on the device and submitting the nonce
//! together with the password hash. Both exchanges use the secure channel.

use encdec::{Decode, Encode};
use zeroize::Zeroize;

use super::{ApduError, ApduStatic, Instruction};
use crate::{
    helpers::arr,
    wallet::{name_str, HASH_SIZE, NAME_SIZE},
};

/// Length of the challenge target
pub const POW_TARGET_SIZE: usize = 32;

/// Length of the challenge random number
pub const POW_RAND_NUMBER_SIZE: usize = 32;

/// Length of the challenge solution nonce
pub const POW_NONCE_SIZE: usize = 32;

/// Get challenge request for a locked wallet
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct GetChallengeReq {
    #[encdec(with = "arr")]
    pub name: [u8; NAME_SIZE],
}

impl ApduStatic for GetChallengeReq {
    const INS: u8 = Instruction::GetChallenge as u8;
}

/// Challenge response
///
/// ## Encoding
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                        TARGET (32 bytes)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                     RANDOM NUMBER (32 bytes)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ChallengeResp {
    #[encdec(with = "arr")]
    pub target: [u8; POW_TARGET_SIZE],

    #[encdec(with = "arr")]
    pub random_number: [u8; POW_RAND_NUMBER_SIZE],
}

/// Verify challenge request, submitting a solution and the wallet password hash
#[derive(Clone, PartialEq, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct VerifyChallengeReq {
    #[encdec(with = "arr")]
    pub name: [u8; NAME_SIZE],

    #[encdec(with = "arr")]
    pub nonce: [u8; POW_NONCE_SIZE],

    #[encdec(with = "arr")]
    pub password: [u8; HASH_SIZE],
}

impl ApduStatic for VerifyChallengeReq {
    const INS: u8 = Instruction::VerifyChallenge as u8;
}

/// Debug format [VerifyChallengeReq] with password hash elided
impl core::fmt::Debug for VerifyChallengeReq {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VerifyChallengeReq")
            .field("name", &name_str(&self.name).unwrap_or("<invalid>"))
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

impl Drop for VerifyChallengeReq {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}
