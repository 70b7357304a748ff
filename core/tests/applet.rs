use rand::{rngs::OsRng, RngCore};

use x1_card_core::{
    aead::SessionKey,
    apdu::{
        card::{AcceptableCards, FamilyId},
        challenge::VerifyChallengeReq,
        sign::ECDSA_SIGNATURE_SIZE,
        wallet::{wallet_name, WalletInfo, WalletLookup},
        ApduError, StatusWord,
    },
    engine::{ChannelMode, Engine, Error},
    scratch::{Command, Response},
    shamir::{decrypt_shares, encrypt_shares, PasswordHash, ShamirRecord},
};

mod helpers;
use helpers::*;

const FAMILY: [u8; 4] = [0x10, 0x20, 0x30, 0x40];

fn engine(card: &mut SimCard) -> Engine<&mut SimCard> {
    let mut e = Engine::new(card);
    e.set_device_key_id(KEY_ID);
    e.set_session_key(SessionKey::new(SESSION_KEY));
    e.set_family_id(FamilyId(FAMILY));
    e
}

fn record(total: u8, min: u8) -> ShamirRecord {
    let mut r = ShamirRecord::new(total, min).unwrap();
    for s in r.shares.iter_mut().take(total as usize) {
        OsRng.fill_bytes(s);
    }
    OsRng.fill_bytes(&mut r.checksum);
    r
}

#[test]
fn select_adopts_family() -> anyhow::Result<()> {
    init_log();

    let mut card = SimCard::new(2, FAMILY);
    let mut e = Engine::new(&mut card);
    assert!(e.family_id().is_blank());

    let mut acceptable = AcceptableCards::all();
    let info = e.select_applet(&mut acceptable)?;

    assert_eq!(info.card_number, 2);
    assert_eq!(info.key_id, KEY_ID);
    assert_eq!(e.family_id(), &FamilyId(FAMILY));
    assert!(!acceptable.contains(AcceptableCards::CARD_2));
    assert!(acceptable.contains(AcceptableCards::CARD_1));

    // The same card is not accepted twice
    assert_eq!(
        e.select_applet(&mut acceptable),
        Err(Error::Status(StatusWord::CONDITIONS_NOT_SATISFIED))
    );

    Ok(())
}

#[test]
fn select_family_mismatch() {
    init_log();

    let mut card = SimCard::new(1, [0xde, 0xad, 0xbe, 0xef]);
    let mut e = engine(&mut card);

    let mut acceptable = AcceptableCards::all();
    assert_eq!(
        e.select_applet(&mut acceptable),
        Err(Error::Status(StatusWord::FILE_INVALID))
    );
    assert_eq!(acceptable, AcceptableCards::all());
}

#[test]
fn select_incompatible_applet() {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    card.info.version = [0x01, 0x07];

    let mut e = Engine::new(&mut card);

    let mut acceptable = AcceptableCards::all();
    assert_eq!(
        e.select_applet(&mut acceptable),
        Err(Error::Status(StatusWord::INCOMPATIBLE_APPLET))
    );

    // Family is not adopted from an incompatible card
    assert!(e.family_id().is_blank());
}

#[test]
fn pair_and_unpair() -> anyhow::Result<()> {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    let mut e = engine(&mut card);

    let mut resp = Response::new();
    e.pair(&[1, 2, 3, 4, 5], &mut resp)?;
    assert_eq!(&resp[..], &[5, 4, 3, 2, 1]);

    e.unpair()?;

    Ok(())
}

#[test]
fn wallet_lifecycle() -> anyhow::Result<()> {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    let mut e = engine(&mut card);

    assert!(e.list_wallets()?.is_empty());

    let name = wallet_name("savings").unwrap();
    let dh = PasswordHash::from_password(b"correct horse").double_hash();

    let r = record(2, 2);
    let entry = r.entry(0, name, WalletInfo::PIN_SET, dh)?;

    e.add_wallet(&entry)?;

    // Duplicate names are rejected by the card
    assert_eq!(
        e.add_wallet(&entry),
        Err(Error::Status(StatusWord::WRONG_DATA))
    );

    let list = e.list_wallets()?;
    assert_eq!(list.len(), 1);
    let w = list.iter().next().unwrap();
    assert_eq!(w.name, name);
    assert_eq!(w.info, WalletInfo::PIN_SET);

    let lookup = WalletLookup {
        name,
        password_double_hash: dh,
    };
    let fetched = e.retrieve_wallet(&lookup)?;
    assert_eq!(fetched, entry);

    let bad = WalletLookup {
        name,
        password_double_hash: [0u8; 32],
    };
    assert_eq!(
        e.retrieve_wallet(&bad),
        Err(Error::Status(StatusWord::SECURITY_STATUS_NOT_SATISFIED))
    );

    e.delete_wallet(&lookup)?;
    assert!(e.list_wallets()?.is_empty());

    assert_eq!(
        e.retrieve_wallet(&lookup),
        Err(Error::Status(StatusWord::RECORD_NOT_FOUND))
    );

    Ok(())
}

#[test]
fn wallet_capacity() -> anyhow::Result<()> {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    let mut e = engine(&mut card);

    let r = record(1, 1);

    for i in 0..4 {
        let name = wallet_name(&format!("wallet {i}")).unwrap();
        e.add_wallet(&r.entry(0, name, WalletInfo::empty(), [0x11; 32])?)?;
    }

    let name = wallet_name("one too many").unwrap();
    assert_eq!(
        e.add_wallet(&r.entry(0, name, WalletInfo::empty(), [0x11; 32])?),
        Err(Error::Status(StatusWord::NOT_ENOUGH_MEMORY))
    );
    assert_eq!(e.list_wallets()?.len(), 4);

    Ok(())
}

#[test]
fn invalid_wallet_not_sent() {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    let mut e = engine(&mut card);

    let r = record(3, 2);
    let mut entry = r
        .entry(0, wallet_name("x").unwrap(), WalletInfo::empty(), [0u8; 32])
        .unwrap();
    entry.min_shares = 4;

    assert_eq!(e.add_wallet(&entry), Err(Error::InvalidWallet));
    drop(e);

    assert!(card.frames.is_empty());
}

#[test]
fn unknown_instruction_status() {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    let mut e = engine(&mut card);

    let mut cmd = Command::from_slice(&[0x00, 0x42, 0x00, 0x00, 0x00]).unwrap();
    let mut resp = Response::new();

    let sw = e.exchange(ChannelMode::Plain, &mut cmd, &mut resp).unwrap();
    assert_eq!(sw, StatusWord::INS_NOT_SUPPORTED);
    assert_eq!(&resp[..], &[0x6d, 0x00]);
}

#[test]
fn ecdsa_sign() -> anyhow::Result<()> {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    let mut e = engine(&mut card);

    let data = [0xa5u8; 32];
    let mut sig = [0u8; ECDSA_SIGNATURE_SIZE];

    let n = e.ecdsa_sign(&data, &mut sig)?;
    assert_eq!(n, ECDSA_SIGNATURE_SIZE);
    assert!(sig.iter().all(|b| *b == 0xa5));

    // Signature larger than the output buffer
    let mut short = [0u8; 16];
    assert_eq!(e.ecdsa_sign(&data, &mut short), Err(Error::InvalidLength));

    assert_eq!(
        e.ecdsa_sign(&[], &mut sig),
        Err(Error::Encoding(ApduError::InvalidLength))
    );

    Ok(())
}

#[test]
fn challenge() -> anyhow::Result<()> {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    let mut e = engine(&mut card);

    let name = wallet_name("locked").unwrap();

    let c = e.get_challenge(&name)?;
    assert_eq!(c.target, [0x0f; 32]);
    assert_eq!(c.random_number, [0xf0; 32]);

    let mut req = VerifyChallengeReq {
        name,
        nonce: [0x02; 32],
        password: [0x33; 32],
    };
    assert_eq!(
        e.verify_challenge(&req),
        Err(Error::Status(StatusWord::WRONG_DATA))
    );

    req.nonce = [0x01; 32];
    e.verify_challenge(&req)?;

    Ok(())
}

#[test]
fn inheritance_data() -> anyhow::Result<()> {
    init_log();

    let mut card = SimCard::new(1, FAMILY);
    let mut e = engine(&mut card);

    let name = wallet_name("estate").unwrap();
    let plain = b"in the event of my untimely demise";

    let mut enc = [0u8; 64];
    let n = e.encrypt_data(&name, plain, &mut enc)?;
    assert_eq!(n, plain.len());
    assert_ne!(&enc[..n], &plain[..]);

    let mut dec = [0u8; 64];
    let m = e.decrypt_data(&name, &enc[..n], &mut dec)?;
    assert_eq!(&dec[..m], &plain[..]);

    Ok(())
}

#[test]
fn shares_across_cards() -> anyhow::Result<()> {
    init_log();

    const TOTAL: u8 = 4;

    let name = wallet_name("cold storage").unwrap();
    let password = b"a very long passphrase";

    let mut r = record(TOTAL, 2);
    let plain = r.shares;

    let dh = PasswordHash::from_password(password).double_hash();
    let mut hash = PasswordHash::from_password(password);
    encrypt_shares(&mut r, &mut hash, &mut OsRng)?;
    assert!(hash.is_zero());

    let mut cards: Vec<_> = (1..=TOTAL).map(|n| SimCard::new(n, FAMILY)).collect();

    // Write one share to each card
    let mut acceptable = AcceptableCards::all();
    let mut family = FamilyId::BLANK;

    for (i, card) in cards.iter_mut().enumerate() {
        let mut e = Engine::new(&mut *card);
        e.set_device_key_id(KEY_ID);
        e.set_session_key(SessionKey::new(SESSION_KEY));
        e.set_family_id(family);

        let info = e.select_applet(&mut acceptable)?;
        assert_eq!(info.card_number as usize, i + 1);
        family = *e.family_id();

        e.add_wallet(&r.entry(i, name, WalletInfo::PASSPHRASE_SET, dh)?)?;
    }
    assert!(acceptable.is_empty());
    drop(r);

    // Collect shares back in reverse card order
    let lookup = WalletLookup {
        name,
        password_double_hash: dh,
    };
    let mut loaded = ShamirRecord::new(TOTAL, 2)?;

    for card in cards.iter_mut().rev() {
        let mut e = engine(card);
        let entry = e.retrieve_wallet(&lookup)?;
        loaded.insert(&entry)?;
    }

    let mut hash = PasswordHash::from_password(password);
    decrypt_shares(&mut loaded, &mut hash)?;

    for i in 0..TOTAL as usize {
        assert_eq!(loaded.shares[i], plain[i]);
    }

    Ok(())
}

#[test]
fn shares_wrong_password() -> anyhow::Result<()> {
    init_log();

    let mut r = record(2, 1);

    let mut hash = PasswordHash::from_password(b"right");
    encrypt_shares(&mut r, &mut hash, &mut OsRng)?;

    let mut hash = PasswordHash::from_password(b"wrong");
    assert_eq!(decrypt_shares(&mut r, &mut hash), Err(Error::Decryption));
    assert!(r.shares.iter().all(|s| s.iter().all(|b| *b == 0)));

    Ok(())
}
