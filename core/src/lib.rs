// Copyright (c) 2023 The X1 Card Developers

//! X1 card communication core
//!
//! This provides a hardware-independent [Engine][engine::Engine] for exchanging
//! APDUs with an X1 card applet over a contactless link, see [x1_card_apdu]
//! for APDU objects and wire encodings.
//!
//! Platforms provide a [Transport][engine::Transport] for the reader chip and
//! optionally [Hooks][engine::Hooks] for cancellation and cooperative scheduling.
//!
//! ## Operations
//!
//! Each session with a card starts with [`Engine::select_card`][engine::Engine::select_card]
//! to wait for a card to enter the field, followed by
//! [`Engine::select_applet`][engine::Engine::select_applet] to fetch the card identity
//! and check it belongs to the expected card family.
//!
//! Once the card is selected the device key id reported on selection must be configured
//! via [`Engine::set_device_key_id`][engine::Engine::set_device_key_id] along with the
//! session key, after which wallet storage, challenge and inheritance operations may be
//! issued over the secure channel.
//!
//! ### Exchanges
//!
//! Every operation is a single [`Engine::exchange`][engine::Engine::exchange]:
//!
//! 1. The command is optionally sealed for the secure channel
//! 2. The command is split into frames of at most [SEND_PACKET_MAX_LEN][consts::SEND_PACKET_MAX_LEN]
//!    bytes, each non-final frame acknowledged by the card
//! 3. The response is optionally opened, then further chunks are requested while
//!    the card reports more data available (`0x61XX`)
//!
//! Transient reader errors are retried up to [MAX_RETRIES][consts::MAX_RETRIES] times
//! per exchange, any other failure aborts the exchange.
//!
//! ### Wallet shares
//!
//! Wallet seeds are split into Shamir shares, one per card, each sealed under
//! the wallet password hash with [shamir::encrypt_shares] before being stored,
//! and opened with [shamir::decrypt_shares] once retrieved.
//!

#![cfg_attr(not(feature = "std"), no_std)]

pub use x1_card_apdu::{self as apdu};

pub mod consts;

pub mod engine;

pub mod aead;

pub mod random;

pub mod scratch;

pub mod shamir;

mod applet;
