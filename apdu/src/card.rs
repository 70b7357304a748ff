// Copyright (c) 2023 The X1 Card Developers

//! Applet selection APDUs
//!
//! Selection is always the first exchange with a freshly detected card and
//! returns the card identity: applet version, card family, card number within
//! the family and the key identifier the device must quote on the secure channel.

use encdec::{DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction};

/// X1 card applet identifier
pub const APPLET_AID: [u8; 8] = [0xA0, 0x00, 0x00, 0x08, 0x20, 0x00, 0x03, 0x01];

/// Length of a card family identifier
pub const FAMILY_ID_SIZE: usize = 4;

/// Length of the applet version
pub const CARD_VERSION_SIZE: usize = 2;

/// Length of the device key identifier
pub const KEY_ID_SIZE: usize = 4;

/// Number of cards in a family
pub const MAX_CARDS: u8 = 4;

/// Value of unwritten flash, marking a device that has never seen a card
pub const DEFAULT_VALUE_IN_FLASH: u8 = 0xFF;

/// Applet major version no longer supported by the device
pub const INCOMPATIBLE_MAJOR_VERSION: u8 = 0x01;

/// Select applet by name (`00 A4 04 00 || AID`)
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct SelectAppletReq {}

impl ApduStatic for SelectAppletReq {
    const INS: u8 = Instruction::Select as u8;

    /// Select by DF name
    fn p1(&self) -> u8 {
        0x04
    }
}

impl Encode for SelectAppletReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(APPLET_AID.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < APPLET_AID.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..APPLET_AID.len()].copy_from_slice(&APPLET_AID);

        Ok(APPLET_AID.len())
    }
}

/// Card family identifier, shared by the cards provisioned together
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct FamilyId(pub [u8; FAMILY_ID_SIZE]);

impl FamilyId {
    /// Family id of a device that has not yet adopted a card family
    pub const BLANK: Self = Self([DEFAULT_VALUE_IN_FLASH; FAMILY_ID_SIZE]);

    /// Check whether no family has been adopted yet
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|b| *b == DEFAULT_VALUE_IN_FLASH)
    }
}

impl Default for FamilyId {
    fn default() -> Self {
        Self::BLANK
    }
}

bitflags::bitflags! {
    /// Cards accepted for the current flow
    pub struct AcceptableCards: u8 {
        const CARD_1 = 1 << 0;
        const CARD_2 = 1 << 1;
        const CARD_3 = 1 << 2;
        const CARD_4 = 1 << 3;
    }
}

impl AcceptableCards {
    /// Flag for a given (1-based) card number
    pub fn for_card(card_number: u8) -> Option<Self> {
        match card_number {
            1..=MAX_CARDS => Self::from_bits(1 << (card_number - 1)),
            _ => None,
        }
    }
}

/// Decode a bit-encoded card number (`1, 2, 4, 8`) to `1..=4`
pub fn decode_card_number(encoded: u8) -> Option<u8> {
    match encoded {
        0x01 => Some(1),
        0x02 => Some(2),
        0x04 => Some(3),
        0x08 => Some(4),
        _ => None,
    }
}

/// Encode a card number in `1..=4` to its bit representation
pub fn encode_card_number(card_number: u8) -> Option<u8> {
    match card_number {
        1..=MAX_CARDS => Some(1 << (card_number - 1)),
        _ => None,
    }
}

/// Card identity returned on applet selection
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            VERSION            |          FAMILY_ID ...        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |       ... FAMILY_ID           |  CARD_NUMBER  |  KEY_ID ...   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                  ... KEY_ID                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `CARD_NUMBER` is bit-encoded on the wire, see [decode_card_number].
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct CardInfo {
    /// Applet version (major, minor)
    pub version: [u8; CARD_VERSION_SIZE],

    /// Card family
    pub family_id: FamilyId,

    /// Card number within the family (`1..=4`)
    pub card_number: u8,

    /// Key identifier for the secure channel
    pub key_id: [u8; KEY_ID_SIZE],
}

const CARD_INFO_LEN: usize = CARD_VERSION_SIZE + FAMILY_ID_SIZE + 1 + KEY_ID_SIZE;

impl CardInfo {
    /// Check whether the applet version is one this device can talk to
    pub fn is_compatible(&self) -> bool {
        self.version[0] != INCOMPATIBLE_MAJOR_VERSION
    }

    /// Acceptance flag for this card
    pub fn card_flag(&self) -> Option<AcceptableCards> {
        AcceptableCards::for_card(self.card_number)
    }
}

impl Encode for CardInfo {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(CARD_INFO_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < CARD_INFO_LEN {
            return Err(ApduError::InvalidLength);
        }

        let card_number =
            encode_card_number(self.card_number).ok_or(ApduError::InvalidEncoding)?;

        let mut index = 0;

        buff[index..][..CARD_VERSION_SIZE].copy_from_slice(&self.version);
        index += CARD_VERSION_SIZE;

        buff[index..][..FAMILY_ID_SIZE].copy_from_slice(&self.family_id.0);
        index += FAMILY_ID_SIZE;

        buff[index] = card_number;
        index += 1;

        buff[index..][..KEY_ID_SIZE].copy_from_slice(&self.key_id);
        index += KEY_ID_SIZE;

        Ok(index)
    }
}

impl DecodeOwned for CardInfo {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < CARD_INFO_LEN {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        let mut version = [0u8; CARD_VERSION_SIZE];
        version.copy_from_slice(&buff[index..][..CARD_VERSION_SIZE]);
        index += CARD_VERSION_SIZE;

        let mut family_id = [0u8; FAMILY_ID_SIZE];
        family_id.copy_from_slice(&buff[index..][..FAMILY_ID_SIZE]);
        index += FAMILY_ID_SIZE;

        let card_number = decode_card_number(buff[index]).ok_or(ApduError::InvalidEncoding)?;
        index += 1;

        let mut key_id = [0u8; KEY_ID_SIZE];
        key_id.copy_from_slice(&buff[index..][..KEY_ID_SIZE]);
        index += KEY_ID_SIZE;

        Ok((
            Self {
                version,
                family_id: FamilyId(family_id),
                card_number,
                key_id,
            },
            index,
        ))
    }
}
