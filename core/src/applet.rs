// Copyright (c) 2023 The X1 Card Developers

//! Typed applet operations
//!
//! Each operation encodes its command, runs an exchange in the channel mode the
//! applet expects for it, maps non-success status words to [Error::Status] and
//! decodes the response payload.

use encdec::{Decode, DecodeOwned};
use rand_core::CryptoRngCore;

use crate::{
    apdu::{
        card::{AcceptableCards, CardInfo, SelectAppletReq},
        challenge::{ChallengeResp, GetChallengeReq, VerifyChallengeReq},
        data::TlvResp,
        inheritance::InheritanceReq,
        pair::{PairReq, UnpairReq},
        sign::EcdsaReq,
        status::STATUS_LEN,
        wallet::{
            AddWalletReq, DeleteWalletReq, ListWalletReq, RetrieveWalletReq, WalletEntry,
            WalletList, WalletLookup, NAME_SIZE,
        },
        ApduReq, StatusWord,
    },
    engine::{ChannelMode, Engine, Error, Hooks, Transport},
    scratch::{Command, Response},
};

impl<T: Transport, H: Hooks, RNG: CryptoRngCore> Engine<T, H, RNG> {
    /// Encode and exchange a request, leaving the response payload
    /// (without status word) in `resp`
    fn request<R: ApduReq>(
        &mut self,
        mode: ChannelMode,
        req: &R,
        resp: &mut Response,
    ) -> Result<(), Error> {
        let mut cmd = Command::new();
        cmd.fill(|b| req.encode_command(b).map_err(Error::from))?;

        // Request bodies carry secrets, only the instruction is logged
        #[cfg(feature = "log")]
        log::debug!("request ins 0x{:02x} ({} bytes)", R::INS, cmd.len());

        let sw = self.exchange(mode, &mut cmd, resp)?;
        if !sw.is_ok() {
            resp.clear();

            #[cfg(feature = "log")]
            log::warn!("card returned {}", sw);

            return Err(Error::Status(sw));
        }

        resp.truncate(resp.len() - STATUS_LEN);

        Ok(())
    }

    /// Select the X1 applet, checking the card against the bound card family
    /// and the set of `acceptable` cards
    ///
    /// A device without a bound family adopts the family of the first card
    /// selected. On success the card is removed from `acceptable`.
    pub fn select_applet(&mut self, acceptable: &mut AcceptableCards) -> Result<CardInfo, Error> {
        let mut resp = Response::new();
        self.request(ChannelMode::Plain, &SelectAppletReq::default(), &mut resp)?;

        let (info, _) = CardInfo::decode_owned(&resp)?;

        #[cfg(feature = "log")]
        log::debug!(
            "card {} family {:02x?} version {}.{}",
            info.card_number,
            info.family_id.0,
            info.version[0],
            info.version[1]
        );

        if !info.is_compatible() {
            return Err(Error::Status(StatusWord::INCOMPATIBLE_APPLET));
        }

        if self.family_id().is_blank() {
            #[cfg(feature = "log")]
            log::info!("adopting card family {:02x?}", info.family_id.0);

            self.set_family_id(info.family_id);
        } else if *self.family_id() != info.family_id {
            return Err(Error::Status(StatusWord::FILE_INVALID));
        }

        let flag = info
            .card_flag()
            .ok_or(Error::Status(StatusWord::CONDITIONS_NOT_SATISFIED))?;
        if !acceptable.contains(flag) {
            return Err(Error::Status(StatusWord::CONDITIONS_NOT_SATISFIED));
        }
        acceptable.remove(flag);

        Ok(info)
    }

    /// Pair with the card, writing the card pairing response to `resp`
    pub fn pair(&mut self, data: &[u8], resp: &mut Response) -> Result<(), Error> {
        self.request(ChannelMode::Plain, &PairReq::new(data), resp)
    }

    /// Remove the pairing for this device
    pub fn unpair(&mut self) -> Result<(), Error> {
        let mut resp = Response::new();
        self.request(ChannelMode::Secure, &UnpairReq::default(), &mut resp)
    }

    /// List wallets stored on the card
    pub fn list_wallets(&mut self) -> Result<WalletList, Error> {
        let mut resp = Response::new();
        self.request(ChannelMode::Secure, &ListWalletReq::default(), &mut resp)?;

        let (list, _) = WalletList::decode_owned(&resp)?;
        Ok(list)
    }

    /// Store a wallet share on the card
    pub fn add_wallet(&mut self, entry: &WalletEntry) -> Result<(), Error> {
        if !entry.is_valid() {
            return Err(Error::InvalidWallet);
        }

        let mut resp = Response::new();
        self.request(ChannelMode::Secure, &AddWalletReq::new(entry), &mut resp)
    }

    /// Fetch a wallet share from the card
    pub fn retrieve_wallet(&mut self, lookup: &WalletLookup) -> Result<WalletEntry, Error> {
        let mut resp = Response::new();
        self.request(ChannelMode::Secure, &RetrieveWalletReq(lookup), &mut resp)?;

        let (entry, _) = WalletEntry::decode(&resp)?;
        if !entry.is_valid() || entry.name != lookup.name {
            return Err(Error::InvalidWallet);
        }

        Ok(entry)
    }

    /// Delete a wallet share from the card
    pub fn delete_wallet(&mut self, lookup: &WalletLookup) -> Result<(), Error> {
        let mut resp = Response::new();
        self.request(ChannelMode::Secure, &DeleteWalletReq(lookup), &mut resp)
    }

    /// Sign `data` with the card identity key, writing the signature to `sig`
    /// and returning its length
    pub fn ecdsa_sign(&mut self, data: &[u8], sig: &mut [u8]) -> Result<usize, Error> {
        let mut resp = Response::new();
        self.request(ChannelMode::Plain, &EcdsaReq::new(data), &mut resp)?;

        copy_tlv(&resp, sig)
    }

    /// Fetch a proof-of-work challenge for a locked wallet
    pub fn get_challenge(&mut self, name: &[u8; NAME_SIZE]) -> Result<ChallengeResp, Error> {
        let mut resp = Response::new();
        self.request(
            ChannelMode::Secure,
            &GetChallengeReq { name: *name },
            &mut resp,
        )?;

        let (c, _) = ChallengeResp::decode(&resp)?;
        Ok(c)
    }

    /// Submit a proof-of-work solution
    pub fn verify_challenge(&mut self, req: &VerifyChallengeReq) -> Result<(), Error> {
        let mut resp = Response::new();
        self.request(ChannelMode::Secure, req, &mut resp)
    }

    /// Encrypt inheritance data with the wallet key, writing the result to `out`
    /// and returning its length
    pub fn encrypt_data(
        &mut self,
        name: &[u8; NAME_SIZE],
        plain: &[u8],
        out: &mut [u8],
    ) -> Result<usize, Error> {
        let mut resp = Response::new();
        self.request(
            ChannelMode::Secure,
            &InheritanceReq::encrypt(*name, plain),
            &mut resp,
        )?;

        copy_tlv(&resp, out)
    }

    /// Decrypt inheritance data with the wallet key, writing the result to `out`
    /// and returning its length
    pub fn decrypt_data(
        &mut self,
        name: &[u8; NAME_SIZE],
        encrypted: &[u8],
        out: &mut [u8],
    ) -> Result<usize, Error> {
        let mut resp = Response::new();
        self.request(
            ChannelMode::Secure,
            &InheritanceReq::decrypt(*name, encrypted),
            &mut resp,
        )?;

        copy_tlv(&resp, out)
    }
}

/// Copy a TLV response value to `out`
fn copy_tlv(resp: &[u8], out: &mut [u8]) -> Result<usize, Error> {
    let (tlv, _) = TlvResp::decode(resp)?;
    if tlv.value.len() > out.len() {
        return Err(Error::InvalidLength);
    }

    out[..tlv.value.len()].copy_from_slice(tlv.value);
    Ok(tlv.value.len())
}
