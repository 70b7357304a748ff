// Copyright (c) 2023 The X1 Card Developers

//! Caller-owned command / response buffers
//!
//! [Scratch] buffers hold command and response APDUs for the duration of an
//! exchange. The whole backing storage (not only the used length) is zeroed on
//! [Scratch::clear] and on drop, so secret material never outlives the buffer.

use core::ops::{Deref, DerefMut};

use heapless::Vec;
use zeroize::Zeroize;

use crate::{
    consts::{MAX_COMMAND_LEN, MAX_RESPONSE_LEN},
    engine::Error,
};

/// Command buffer, sized for the largest command accepted by the engine
pub type Command = Scratch<MAX_COMMAND_LEN>;

/// Response buffer, sized for the largest accumulated response
pub type Response = Scratch<MAX_RESPONSE_LEN>;

/// Fixed capacity buffer with zero-on-release
pub struct Scratch<const N: usize> {
    buff: Vec<u8, N>,
}

impl<const N: usize> Scratch<N> {
    /// Create a new empty buffer
    pub const fn new() -> Self {
        Self { buff: Vec::new() }
    }

    /// Create a buffer holding a copy of the provided data
    pub fn from_slice(data: &[u8]) -> Result<Self, Error> {
        let mut s = Self::new();
        s.extend_from_slice(data)?;
        Ok(s)
    }

    /// Buffer capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Space remaining
    pub fn remaining(&self) -> usize {
        N - self.buff.len()
    }

    /// Append data to the buffer
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), Error> {
        self.buff
            .extend_from_slice(data)
            .map_err(|_| Error::InvalidLength)
    }

    /// Shorten the buffer, zeroing the released bytes
    pub fn truncate(&mut self, len: usize) {
        if len >= self.buff.len() {
            return;
        }

        self.buff[len..].zeroize();
        self.buff.truncate(len);
    }

    /// Replace the buffer contents with the output of `f`,
    /// called with the full capacity and returning the written length
    ///
    /// A returned length beyond capacity empties the buffer and fails with
    /// [Error::InvalidLength].
    pub fn fill<E: From<Error>>(
        &mut self,
        f: impl FnOnce(&mut [u8]) -> Result<usize, E>,
    ) -> Result<usize, E> {
        self.clear();

        // Never exceeds capacity
        let _ = self.buff.resize(N, 0);

        match f(&mut self.buff[..]) {
            Ok(n) if n > N => {
                self.clear();
                Err(Error::InvalidLength.into())
            }
            Ok(n) => {
                self.truncate(n);
                Ok(n)
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// Zero and empty the buffer
    pub fn clear(&mut self) {
        // Extend to capacity so stale bytes beyond the current length are wiped too
        let _ = self.buff.resize(N, 0);
        self.buff[..].zeroize();
        self.buff.clear();
    }
}

impl<const N: usize> Default for Scratch<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Deref for Scratch<N> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buff
    }
}

impl<const N: usize> DerefMut for Scratch<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buff
    }
}

impl<const N: usize> Zeroize for Scratch<N> {
    fn zeroize(&mut self) {
        self.clear()
    }
}

impl<const N: usize> Drop for Scratch<N> {
    fn drop(&mut self) {
        self.clear()
    }
}

/// Debug format [Scratch] with contents elided
impl<const N: usize> core::fmt::Debug for Scratch<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Scratch<{N}>({} bytes)", self.buff.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capacity_checked() {
        let mut s = Scratch::<4>::new();

        s.extend_from_slice(&[1, 2, 3]).unwrap();
        assert_eq!(s.remaining(), 1);

        assert_eq!(s.extend_from_slice(&[4, 5]), Err(Error::InvalidLength));
        assert_eq!(&s[..], &[1, 2, 3]);
    }

    #[test]
    fn truncate_and_clear() {
        let mut s = Scratch::<8>::from_slice(&[0xaa; 8]).unwrap();

        s.truncate(2);
        assert_eq!(&s[..], &[0xaa, 0xaa]);

        s.truncate(4);
        assert_eq!(s.len(), 2);

        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.remaining(), 8);
    }

    #[test]
    fn fill_sets_length() {
        let mut s = Scratch::<16>::new();
        let n = s
            .fill(|b| {
                b[..3].copy_from_slice(&[7, 8, 9]);
                Ok::<_, Error>(3)
            })
            .unwrap();

        assert_eq!(n, 3);
        assert_eq!(&s[..], &[7, 8, 9]);

        assert_eq!(s.fill(|_| Err(Error::Encryption)), Err(Error::Encryption));
        assert!(s.is_empty());
    }

    #[test]
    fn fill_rejects_overlong() {
        let mut s = Scratch::<16>::from_slice(&[0x55; 4]).unwrap();

        assert_eq!(
            s.fill(|b| {
                b.fill(0xaa);
                Ok::<_, Error>(17)
            }),
            Err(Error::InvalidLength)
        );
        assert!(s.is_empty());
        assert_eq!(s.remaining(), 16);
    }
}
