// Copyright (c) 2023 The X1 Card Developers

//! Combined random source
//!
//! Devices with a secure element mix its random output into the platform
//! CSPRNG, so nonces stay unpredictable should either source be weak.

use rand_core::{impls, CryptoRng, Error, RngCore};
use zeroize::Zeroize;

/// Chunk size for mixing secondary source output
const MIX_CHUNK: usize = 32;

/// [RngCore] filling from `primary` and exclusive-oring in bytes from `secondary`
pub struct XorRng<A, B> {
    primary: A,
    secondary: B,
}

impl<A: RngCore, B: RngCore> XorRng<A, B> {
    /// Combine a primary CSPRNG with a secondary (hardware) source
    pub const fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    fn mix(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        let mut tmp = [0u8; MIX_CHUNK];

        for chunk in dest.chunks_mut(MIX_CHUNK) {
            let t = &mut tmp[..chunk.len()];
            if let Err(e) = self.secondary.try_fill_bytes(t) {
                tmp.zeroize();
                return Err(e);
            }

            for (d, s) in chunk.iter_mut().zip(t.iter()) {
                *d ^= *s;
            }
        }

        tmp.zeroize();
        Ok(())
    }
}

impl<A: RngCore, B: RngCore> RngCore for XorRng<A, B> {
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.primary.fill_bytes(dest);

        // Secondary failures leave the primary output in place
        if let Err(_e) = self.mix(dest) {
            #[cfg(feature = "log")]
            log::warn!("secondary random source failed: {}", _e);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.primary.try_fill_bytes(dest)?;
        self.mix(dest)
    }
}

impl<A: RngCore + CryptoRng, B: RngCore> CryptoRng for XorRng<A, B> {}
