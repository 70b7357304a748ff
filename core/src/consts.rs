// Copyright (c) 2023 The X1 Card Developers

//! Protocol constants

use static_assertions::const_assert;

use crate::apdu::{self, card::KEY_ID_SIZE, status::STATUS_LEN};

/// Length of the command header (`CLA INS P1 P2 Lc`)
pub const HEADER_LEN: usize = apdu::OFFSET_CDATA;

/// Maximum command length (header and body) accepted by the engine
pub const MAX_COMMAND_LEN: usize = apdu::MAX_COMMAND_LEN;

/// Maximum accumulated response length (payload and status word)
pub const MAX_RESPONSE_LEN: usize = 600;

/// Maximum body bytes carried by a single outbound frame
pub const SEND_PACKET_MAX_LEN: usize = 236;

/// Maximum inbound frame length with secure channel overhead
pub const RECV_PACKET_MAX_ENC_LEN: usize = 242;

/// Maximum inbound plaintext frame length, used to index continuation requests
pub const RECV_PACKET_MAX_LEN: usize = 225;

/// Outbound frame buffer length (frame header and body chunk)
pub const FRAME_LEN: usize = HEADER_LEN + SEND_PACKET_MAX_LEN;

/// Retries permitted per exchange for transient reader errors
pub const MAX_RETRIES: u8 = 3;

/// Chain tag for the last (or only) frame of a command
pub const CHAIN_LAST: u8 = 0x00;

/// Chain tag for the first frame of a multi-frame command
pub const CHAIN_FIRST: u8 = 0x10;

/// Chain tag for middle frames of a multi-frame command
pub const CHAIN_MIDDLE: u8 = 0x80;

/// Ack value signalling the card will accept any remaining length
pub const ACK_ANY: u8 = 0xFF;

/// AEAD key length
pub const KEY_LEN: usize = 32;

/// AEAD nonce length
pub const NONCE_LEN: usize = 12;

/// AEAD tag length
pub const TAG_LEN: usize = 16;

/// Secure channel overhead on responses (nonce and tag)
pub const SECURE_RESP_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// Secure channel overhead on commands (nonce, tag and key id)
pub const SECURE_CMD_OVERHEAD: usize = NONCE_LEN + TAG_LEN + KEY_ID_SIZE;

const_assert!(SEND_PACKET_MAX_LEN < u8::MAX as usize);
const_assert!(RECV_PACKET_MAX_LEN < RECV_PACKET_MAX_ENC_LEN);
const_assert!(RECV_PACKET_MAX_ENC_LEN > SECURE_RESP_OVERHEAD + STATUS_LEN);
const_assert!(MAX_COMMAND_LEN > SEND_PACKET_MAX_LEN);
const_assert!(MAX_RESPONSE_LEN / RECV_PACKET_MAX_LEN < u8::MAX as usize);
const_assert!(NONCE_LEN == apdu::wallet::SHARE_NONCE_SIZE);
const_assert!(TAG_LEN == apdu::wallet::SHARE_TAG_SIZE);
const_assert!(KEY_LEN == apdu::wallet::HASH_SIZE);
