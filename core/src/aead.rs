// Copyright (c) 2023 The X1 Card Developers

//! Authenticated encryption primitive
//!
//! ChaCha20-Poly1305 (RFC 8439) with detached tags, shared by the secure channel
//! and the Shamir share codec. Buffers are transformed in place.

use chacha20poly1305::{aead::AeadInPlace, ChaCha20Poly1305, Key, KeyInit, Nonce, Tag};
use zeroize::Zeroize;

use crate::consts::{KEY_LEN, NONCE_LEN, TAG_LEN};

/// Symmetric session key, zeroed on drop
#[derive(Clone, PartialEq)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    pub const fn new(key: [u8; KEY_LEN]) -> Self {
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for SessionKey {
    fn from(key: [u8; KEY_LEN]) -> Self {
        Self(key)
    }
}

impl Zeroize for SessionKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl core::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SessionKey(..)")
    }
}

/// Authentication failure (or oversized input)
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AeadError;

/// Encrypt `buff` in place, returning the authentication tag
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buff: &mut [u8],
) -> Result<[u8; TAG_LEN], AeadError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, buff)
        .map_err(|_| AeadError)?;

    let mut t = [0u8; TAG_LEN];
    t.copy_from_slice(&tag);
    Ok(t)
}

/// Verify and decrypt `buff` in place
///
/// On failure `buff` is left unmodified (still ciphertext).
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buff: &mut [u8],
    tag: &[u8; TAG_LEN],
) -> Result<(), AeadError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    cipher
        .decrypt_in_place_detached(Nonce::from_slice(nonce), aad, buff, Tag::from_slice(tag))
        .map_err(|_| AeadError)
}
