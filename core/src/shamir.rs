// Copyright (c) 2023 The X1 Card Developers

//! Shamir share codec
//!
//! Wallet seeds are split into up to [MAX_SHARES] shares, one stored on each
//! card (and one retained on the device). Each share block is sealed in place
//! under the wallet password hash with a fresh random nonce, the share index
//! bound as associated data. The nonce and tag are kept alongside the share as
//! its encryption data.
//!
//! The password hash is wiped after every pass, successful or not.

use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::{
    aead,
    apdu::wallet::{
        WalletEntry, WalletInfo, CHECKSUM_SIZE, HASH_SIZE, NAME_SIZE, SHARE_ENCRYPTION_DATA_SIZE,
        SHARE_SIZE,
    },
    consts::{NONCE_LEN, TAG_LEN},
    engine::Error,
};

/// Maximum number of shares per wallet
pub const MAX_SHARES: usize = 5;

/// Wallet password hash, used as the share encryption key
pub struct PasswordHash([u8; HASH_SIZE]);

impl PasswordHash {
    pub const fn new(hash: [u8; HASH_SIZE]) -> Self {
        Self(hash)
    }

    /// Derive the share encryption key from a wallet password (single SHA-256)
    pub fn from_password(password: &[u8]) -> Self {
        let mut h = [0u8; HASH_SIZE];
        h.copy_from_slice(&Sha256::digest(password));
        Self(h)
    }

    /// Double hash of the password, checked by the card on wallet access
    pub fn double_hash(&self) -> [u8; HASH_SIZE] {
        let mut h = [0u8; HASH_SIZE];
        h.copy_from_slice(&Sha256::digest(&self.0));
        h
    }

    /// Check whether the hash has been wiped
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl Zeroize for PasswordHash {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for PasswordHash {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PasswordHash(..)")
    }
}

/// Shamir record for a wallet: share blocks with their encryption data
#[derive(Clone, PartialEq, Debug)]
pub struct ShamirRecord {
    /// Total number of shares
    pub total_shares: u8,

    /// Shares required to recover the secret
    pub min_shares: u8,

    /// Share blocks, plaintext or sealed depending on the last pass
    pub shares: [[u8; SHARE_SIZE]; MAX_SHARES],

    /// Share x coordinates
    pub x_coords: [u8; MAX_SHARES],

    /// Per-share nonce and tag
    pub encryption_data: [[u8; SHARE_ENCRYPTION_DATA_SIZE]; MAX_SHARES],

    /// Wallet checksum
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl ShamirRecord {
    /// Create an empty record for the given share counts
    pub fn new(total_shares: u8, min_shares: u8) -> Result<Self, Error> {
        let s = Self {
            total_shares,
            min_shares,
            shares: [[0u8; SHARE_SIZE]; MAX_SHARES],
            x_coords: core::array::from_fn(|i| i as u8),
            encryption_data: [[0u8; SHARE_ENCRYPTION_DATA_SIZE]; MAX_SHARES],
            checksum: [0u8; CHECKSUM_SIZE],
        };
        s.check_counts()?;
        Ok(s)
    }

    /// Check share counts: `1..=MAX_SHARES` shares, `1 <= min <= total`
    pub fn check_counts(&self) -> Result<(), Error> {
        let total = self.total_shares as usize;
        let min = self.min_shares as usize;

        match (1..=MAX_SHARES).contains(&total) && (1..=total).contains(&min) {
            true => Ok(()),
            false => Err(Error::InvalidShareCount),
        }
    }

    /// Build the card entry for share `index`
    pub fn entry(
        &self,
        index: usize,
        name: [u8; NAME_SIZE],
        info: WalletInfo,
        password_double_hash: [u8; HASH_SIZE],
    ) -> Result<WalletEntry, Error> {
        if index >= self.total_shares as usize {
            return Err(Error::InvalidShareCount);
        }

        Ok(WalletEntry {
            name,
            info,
            password_double_hash,
            x_coord: self.x_coords[index],
            total_shares: self.total_shares,
            min_shares: self.min_shares,
            share: self.shares[index],
            share_encryption_data: self.encryption_data[index],
            checksum: self.checksum,
        })
    }

    /// Load a share retrieved from a card, indexed by its x coordinate
    pub fn insert(&mut self, entry: &WalletEntry) -> Result<(), Error> {
        let index = entry.x_coord as usize;
        if entry.total_shares != self.total_shares
            || entry.min_shares != self.min_shares
            || index >= self.total_shares as usize
        {
            return Err(Error::InvalidWallet);
        }

        self.shares[index] = entry.share;
        self.x_coords[index] = entry.x_coord;
        self.encryption_data[index] = entry.share_encryption_data;
        self.checksum = entry.checksum;

        Ok(())
    }
}

impl Zeroize for ShamirRecord {
    fn zeroize(&mut self) {
        self.shares.iter_mut().for_each(|s| s.zeroize());
        self.encryption_data.iter_mut().for_each(|d| d.zeroize());
    }
}

impl Drop for ShamirRecord {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Seal each share in place under the password hash, drawing a fresh nonce per share
///
/// The password hash is wiped on return.
pub fn encrypt_shares(
    record: &mut ShamirRecord,
    hash: &mut PasswordHash,
    rng: &mut impl CryptoRngCore,
) -> Result<(), Error> {
    let r = encrypt_inner(record, hash, rng);

    hash.zeroize();

    if r.is_err() {
        record.zeroize();
    }

    r
}

fn encrypt_inner(
    record: &mut ShamirRecord,
    hash: &PasswordHash,
    rng: &mut impl CryptoRngCore,
) -> Result<(), Error> {
    record.check_counts()?;

    for i in 0..record.total_shares as usize {
        let data = &mut record.encryption_data[i];
        let (nonce, tag) = data.split_at_mut(NONCE_LEN);

        rng.fill_bytes(nonce);

        let mut n = [0u8; NONCE_LEN];
        n.copy_from_slice(nonce);

        let t = aead::seal(hash.as_bytes(), &n, &[i as u8], &mut record.shares[i])
            .map_err(|_| Error::Encryption)?;
        tag.copy_from_slice(&t);
    }

    #[cfg(feature = "log")]
    log::debug!("sealed {} shares", record.total_shares);

    Ok(())
}

/// Open each share in place under the password hash
///
/// The password hash and all share encryption data are wiped on return,
/// the shares too on failure.
pub fn decrypt_shares(record: &mut ShamirRecord, hash: &mut PasswordHash) -> Result<(), Error> {
    let r = decrypt_inner(record, hash);

    hash.zeroize();
    record
        .encryption_data
        .iter_mut()
        .for_each(|d| d.zeroize());

    if r.is_err() {
        #[cfg(feature = "log")]
        log::error!("failed to open shares");

        record.shares.iter_mut().for_each(|s| s.zeroize());
    }

    r
}

fn decrypt_inner(record: &mut ShamirRecord, hash: &PasswordHash) -> Result<(), Error> {
    record.check_counts()?;

    for i in 0..record.total_shares as usize {
        let data = &record.encryption_data[i];

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&data[..NONCE_LEN]);

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&data[NONCE_LEN..]);

        aead::open(hash.as_bytes(), &nonce, &[i as u8], &mut record.shares[i], &tag)
            .map_err(|_| Error::Decryption)?;
    }

    Ok(())
}
