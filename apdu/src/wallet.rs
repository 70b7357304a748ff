// Copyright (c) 2023 The X1 Card Developers

//! Wallet storage APDUs
//!
//! Each card of a family stores one encrypted Shamir share per wallet
//! alongside the wallet metadata needed to recombine it. All wallet
//! storage APDUs are exchanged over the secure channel.

use encdec::{Decode, DecodeOwned, Encode};
use zeroize::Zeroize;

use super::{ApduError, ApduStatic, Instruction};
use crate::helpers::arr;

/// Length of a wallet name (nul padded)
pub const NAME_SIZE: usize = 16;

/// Length of a single share block
pub const SHARE_SIZE: usize = 32;

/// Length of the share nonce
pub const SHARE_NONCE_SIZE: usize = 12;

/// Length of the share authentication tag
pub const SHARE_TAG_SIZE: usize = 16;

/// Length of the per-share nonce + tag blob
pub const SHARE_ENCRYPTION_DATA_SIZE: usize = SHARE_NONCE_SIZE + SHARE_TAG_SIZE;

/// Length of password hashes
pub const HASH_SIZE: usize = 32;

/// Length of the wallet checksum
pub const CHECKSUM_SIZE: usize = 4;

/// Maximum number of wallets on a card
pub const MAX_WALLETS: usize = 4;

bitflags::bitflags! {
    /// Wallet configuration flags
    pub struct WalletInfo: u8 {
        /// Wallet is protected by a PIN
        const PIN_SET = 1 << 0;
        /// Wallet seed requires a passphrase
        const PASSPHRASE_SET = 1 << 1;
        /// Wallet holds arbitrary data rather than a mnemonic
        const ARBITRARY_DATA = 1 << 2;
    }
}

crate::encdec_bitflags!(WalletInfo);

/// Build a nul-padded wallet name
pub fn wallet_name(name: &str) -> Result<[u8; NAME_SIZE], ApduError> {
    let b = name.as_bytes();
    // Keep a terminating nul
    if b.is_empty() || b.len() >= NAME_SIZE {
        return Err(ApduError::InvalidLength);
    }

    let mut n = [0u8; NAME_SIZE];
    n[..b.len()].copy_from_slice(b);
    Ok(n)
}

/// Fetch the string portion of a nul-padded wallet name
pub fn name_str(name: &[u8; NAME_SIZE]) -> Result<&str, ApduError> {
    let n = name.iter().position(|c| *c == 0).unwrap_or(NAME_SIZE);
    core::str::from_utf8(&name[..n]).map_err(|_| ApduError::Utf8)
}

/// Wallet record as stored on a single card
///
/// `share` holds the encrypted share block for this card, `share_encryption_data`
/// the nonce and tag it was sealed with.
#[derive(Clone, PartialEq, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct WalletEntry {
    /// Wallet name
    #[encdec(with = "arr")]
    pub name: [u8; NAME_SIZE],

    /// Wallet flags
    pub info: WalletInfo,

    /// Double hash of the wallet password, checked by the card
    #[encdec(with = "arr")]
    pub password_double_hash: [u8; HASH_SIZE],

    /// Share x coordinate
    pub x_coord: u8,

    /// Total number of shares
    pub total_shares: u8,

    /// Minimum number of shares to recover the secret
    pub min_shares: u8,

    /// Encrypted share block
    #[encdec(with = "arr")]
    pub share: [u8; SHARE_SIZE],

    /// Nonce and tag for the share block
    #[encdec(with = "arr")]
    pub share_encryption_data: [u8; SHARE_ENCRYPTION_DATA_SIZE],

    /// Wallet checksum
    #[encdec(with = "arr")]
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl WalletEntry {
    /// Check the share counts are consistent
    pub fn is_valid(&self) -> bool {
        self.min_shares >= 1
            && self.min_shares <= self.total_shares
            && self.x_coord < self.total_shares
            && name_str(&self.name).map(|n| !n.is_empty()).unwrap_or(false)
    }
}

/// Debug format [WalletEntry] with password hash and share material elided
impl core::fmt::Debug for WalletEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WalletEntry")
            .field("name", &name_str(&self.name).unwrap_or("<invalid>"))
            .field("info", &self.info)
            .field("x_coord", &self.x_coord)
            .field("total_shares", &self.total_shares)
            .field("min_shares", &self.min_shares)
            .finish_non_exhaustive()
    }
}

impl Zeroize for WalletEntry {
    fn zeroize(&mut self) {
        self.password_double_hash.zeroize();
        self.share.zeroize();
        self.share_encryption_data.zeroize();
        self.checksum.zeroize();
    }
}

impl Drop for WalletEntry {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Add wallet request, storing a [WalletEntry] on the card
#[derive(Clone, PartialEq, Debug)]
pub struct AddWalletReq<'a> {
    pub entry: &'a WalletEntry,
}

impl<'a> AddWalletReq<'a> {
    pub fn new(entry: &'a WalletEntry) -> Self {
        Self { entry }
    }
}

impl<'a> ApduStatic for AddWalletReq<'a> {
    const INS: u8 = Instruction::AddWallet as u8;
}

impl<'a> Encode for AddWalletReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        self.entry.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        self.entry.encode(buff)
    }
}

/// Wallet lookup, used to retrieve or delete a wallet
#[derive(Clone, PartialEq, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct WalletLookup {
    /// Wallet name
    #[encdec(with = "arr")]
    pub name: [u8; NAME_SIZE],

    /// Double hash of the wallet password
    #[encdec(with = "arr")]
    pub password_double_hash: [u8; HASH_SIZE],
}

/// Debug format [WalletLookup] with password hash elided
impl core::fmt::Debug for WalletLookup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WalletLookup")
            .field("name", &name_str(&self.name).unwrap_or("<invalid>"))
            .finish_non_exhaustive()
    }
}

impl Drop for WalletLookup {
    fn drop(&mut self) {
        self.password_double_hash.zeroize();
    }
}

/// Retrieve wallet request, answered with a [WalletEntry]
#[derive(Clone, PartialEq, Debug)]
pub struct RetrieveWalletReq<'a>(pub &'a WalletLookup);

impl<'a> ApduStatic for RetrieveWalletReq<'a> {
    const INS: u8 = Instruction::RetrieveWallet as u8;
}

impl<'a> Encode for RetrieveWalletReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        self.0.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.encode(buff)
    }
}

/// Delete wallet request
#[derive(Clone, PartialEq, Debug)]
pub struct DeleteWalletReq<'a>(pub &'a WalletLookup);

impl<'a> ApduStatic for DeleteWalletReq<'a> {
    const INS: u8 = Instruction::DeleteWallet as u8;
}

impl<'a> Encode for DeleteWalletReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        self.0.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.encode(buff)
    }
}

/// List wallets request
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct ListWalletReq {}

impl ApduStatic for ListWalletReq {
    const INS: u8 = Instruction::ListWallet as u8;
}

impl Encode for ListWalletReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

/// Wallet summary returned by [ListWalletReq]
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct WalletSummary {
    pub name: [u8; NAME_SIZE],
    pub info: WalletInfo,
}

impl WalletSummary {
    const LEN: usize = NAME_SIZE + 1;
}

/// Wallet list response
///
/// ## Encoding
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     COUNT     |  COUNT * (NAME[16] || INFO) ...               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct WalletList {
    count: usize,
    wallets: [Option<WalletSummary>; MAX_WALLETS],
}

impl WalletList {
    /// Create a wallet list from the provided summaries
    pub fn new(wallets: &[WalletSummary]) -> Result<Self, ApduError> {
        if wallets.len() > MAX_WALLETS {
            return Err(ApduError::InvalidLength);
        }

        let mut s = Self::default();
        for (i, w) in wallets.iter().enumerate() {
            s.wallets[i] = Some(*w);
        }
        s.count = wallets.len();

        Ok(s)
    }

    /// Number of wallets on the card
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate over listed wallets
    pub fn iter(&self) -> impl Iterator<Item = &WalletSummary> {
        self.wallets.iter().filter_map(|w| w.as_ref())
    }
}

impl Encode for WalletList {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + self.count * WalletSummary::LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.count as u8;
        let mut index = 1;

        for w in self.iter() {
            buff[index..][..NAME_SIZE].copy_from_slice(&w.name);
            index += NAME_SIZE;
            index += w.info.encode(&mut buff[index..])?;
        }

        Ok(index)
    }
}

impl DecodeOwned for WalletList {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let count = buff[0] as usize;
        if count > MAX_WALLETS {
            return Err(ApduError::InvalidEncoding);
        }
        if buff.len() < 1 + count * WalletSummary::LEN {
            return Err(ApduError::InvalidLength);
        }

        let mut s = Self {
            count,
            ..Default::default()
        };
        let mut index = 1;

        for w in s.wallets.iter_mut().take(count) {
            let mut name = [0u8; NAME_SIZE];
            name.copy_from_slice(&buff[index..][..NAME_SIZE]);
            index += NAME_SIZE;

            let (info, n) = WalletInfo::decode_owned(&buff[index..])?;
            index += n;

            *w = Some(WalletSummary { name, info });
        }

        Ok((s, index))
    }
}
