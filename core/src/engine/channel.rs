// Copyright (c) 2023 The X1 Card Developers

//! Secure channel codec
//!
//! Sealed commands carry the encrypted body followed by the nonce, tag and the
//! device key id, bound to the command header:
//!
//! ```text
//! +--------+------------------+----------+---------+------------+
//! | HEADER |  CIPHERTEXT ...  | NONCE 12 |  TAG 16 |  KEY_ID 4  |
//! +--------+------------------+----------+---------+------------+
//!             aad: INS || P1 || P2
//! ```
//!
//! Sealed responses (any response longer than a bare status word) carry the
//! nonce and tag ahead of the status word, which is used as associated data:
//!
//! ```text
//! +------------------+----------+---------+------+
//! |  CIPHERTEXT ...  | NONCE 12 |  TAG 16 |  SW  |
//! +------------------+----------+---------+------+
//! ```

use rand_core::CryptoRngCore;
use zeroize::Zeroize;

use super::Error;
use crate::{
    aead::{self, SessionKey},
    apdu::{card::KEY_ID_SIZE, status::STATUS_LEN, OFFSET_INS, OFFSET_LC, OFFSET_P2},
    consts::{HEADER_LEN, NONCE_LEN, SECURE_CMD_OVERHEAD, SECURE_RESP_OVERHEAD, TAG_LEN},
    scratch::Command,
};

/// Channel mode, selected per operation
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ChannelMode {
    /// Unauthenticated exchange
    Plain,
    /// Payloads sealed under the session key
    Secure,
}

/// Secure channel session state
#[derive(Default)]
pub struct SecureChannel {
    key: Option<SessionKey>,
    key_id: [u8; KEY_ID_SIZE],
}

impl SecureChannel {
    pub const fn new() -> Self {
        Self {
            key: None,
            key_id: [0u8; KEY_ID_SIZE],
        }
    }

    /// Set the device key id quoted on sealed commands
    pub fn set_key_id(&mut self, key_id: [u8; KEY_ID_SIZE]) {
        self.key_id = key_id;
    }

    /// Device key id
    pub fn key_id(&self) -> &[u8; KEY_ID_SIZE] {
        &self.key_id
    }

    /// Set the session key
    pub fn set_key(&mut self, key: SessionKey) {
        self.key = Some(key);
    }

    /// Check whether a session key is configured
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Drop session material
    pub fn clear(&mut self) {
        if let Some(k) = self.key.as_mut() {
            k.zeroize();
        }
        self.key = None;
        self.key_id.zeroize();
    }

    /// Seal a command in place
    ///
    /// Commands with a body are encrypted and gain a nonce and tag, the key id
    /// is appended in every case and the declared length adjusted to match.
    pub fn seal_command(
        &self,
        cmd: &mut Command,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(), Error> {
        let key = self.key.as_ref().ok_or(Error::MissingSessionKey)?;

        if cmd.len() < HEADER_LEN {
            return Err(Error::InvalidLength);
        }
        if cmd.len() + SECURE_CMD_OVERHEAD > cmd.capacity() {
            return Err(Error::CommandTooLong);
        }

        let body_len = cmd.len() - HEADER_LEN;
        let mut added = KEY_ID_SIZE;

        if body_len > 0 {
            let mut nonce = [0u8; NONCE_LEN];
            rng.fill_bytes(&mut nonce);

            let mut aad = [0u8; 3];
            aad.copy_from_slice(&cmd[OFFSET_INS..=OFFSET_P2]);

            let tag = aead::seal(key.as_bytes(), &nonce, &aad, &mut cmd[HEADER_LEN..])
                .map_err(|_| Error::Encryption)?;

            cmd.extend_from_slice(&nonce)?;
            cmd.extend_from_slice(&tag)?;
            added += NONCE_LEN + TAG_LEN;
        }

        cmd.extend_from_slice(&self.key_id)?;

        // Frames carry their own length, this only tracks the declared body
        cmd[OFFSET_LC] = cmd[OFFSET_LC].wrapping_add(added as u8);

        #[cfg(feature = "log")]
        log::debug!("sealed {} byte body ({} bytes total)", body_len, cmd.len());

        Ok(())
    }

    /// Open a response frame of length `n` in place, returning the
    /// plaintext frame length (`payload || SW`)
    ///
    /// Bare status words pass through unmodified. On failure the frame is zeroed.
    pub fn open_response(&self, frame: &mut [u8], n: usize) -> Result<usize, Error> {
        if n <= STATUS_LEN {
            return Ok(n);
        }

        match self.open_inner(frame, n) {
            Ok(v) => Ok(v),
            Err(e) => {
                let l = n.min(frame.len());
                frame[..l].zeroize();

                #[cfg(feature = "log")]
                log::error!("failed to open {} byte response: {}", n, e);

                Err(e)
            }
        }
    }

    fn open_inner(&self, frame: &mut [u8], n: usize) -> Result<usize, Error> {
        let key = self.key.as_ref().ok_or(Error::MissingSessionKey)?;

        if n > frame.len() || n < SECURE_RESP_OVERHEAD + STATUS_LEN {
            return Err(Error::Decryption);
        }

        let c_len = n - SECURE_RESP_OVERHEAD - STATUS_LEN;

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&frame[c_len..][..NONCE_LEN]);

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&frame[c_len + NONCE_LEN..][..TAG_LEN]);

        let mut sw = [0u8; STATUS_LEN];
        sw.copy_from_slice(&frame[n - STATUS_LEN..n]);

        aead::open(key.as_bytes(), &nonce, &sw, &mut frame[..c_len], &tag)
            .map_err(|_| Error::Decryption)?;

        // Move status word down over the nonce, clear the tail
        frame[c_len..][..STATUS_LEN].copy_from_slice(&sw);
        frame[c_len + STATUS_LEN..n].zeroize();

        Ok(c_len + STATUS_LEN)
    }
}
