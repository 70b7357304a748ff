// Copyright (c) 2023 The X1 Card Developers

//! The [Engine] exchanges APDUs with an X1 card over a contactless [Transport].
//!
//! Each [Engine::exchange] runs to completion on the calling context:
//! the command is optionally sealed, split into frames, the response opened
//! and any further response chunks fetched, see [apdu][crate::apdu] for APDU
//! protocol / encoding definitions.

use rand_core::{CryptoRngCore, OsRng};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    aead::SessionKey,
    apdu::{
        card::{FamilyId, KEY_ID_SIZE},
        status::STATUS_LEN,
        StatusWord,
    },
    consts::{FRAME_LEN, HEADER_LEN, MAX_COMMAND_LEN, RECV_PACKET_MAX_ENC_LEN},
    scratch::{Command, Response},
};

mod error;
pub use error::Error;

mod hal;
pub use hal::{HalError, Hooks, NoHooks, Transport};

mod config;
pub use config::Config;

mod retry;
pub use retry::{Retry, RetryState};

mod channel;
pub use channel::{ChannelMode, SecureChannel};

pub mod fragment;
use fragment::Fragments;

pub mod reassemble;

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum State {
    /// Idle, no exchange running
    Idle,
    /// Preparing (and sealing) a command
    Build,
    /// Sending the numbered command frame
    SendFragment(usize),
    /// Awaiting acknowledgement of the numbered command frame
    AwaitAck(usize),
    /// Awaiting the response to the final frame
    AwaitResponse,
    /// Fetching the numbered response chunk
    Continuation(u8),
    /// Decoding the accumulated response
    Decode,
    /// Exchange complete
    Done,
    /// Exchange aborted
    Aborted,
}

/// [Engine] provides hardware-independent card exchanges for X1 wallets
///
pub struct Engine<T: Transport, H: Hooks = NoHooks, RNG: CryptoRngCore = OsRng> {
    state: State,
    cfg: Config,
    retries: RetryState,

    channel: SecureChannel,
    family_id: FamilyId,

    transport: T,
    hooks: H,
    rng: RNG,
}

impl<T: Transport> Engine<T> {
    /// Create a new engine instance with the provided transport,
    /// using the default [OsRng] and no hooks
    pub const fn new(transport: T) -> Self {
        Self::new_with_rng(transport, NoHooks, OsRng {})
    }
}

impl<T: Transport, H: Hooks, RNG: CryptoRngCore> Engine<T, H, RNG> {
    /// Create a new engine instance with the provided transport, hooks and rng
    pub const fn new_with_rng(transport: T, hooks: H, rng: RNG) -> Self {
        let cfg = Config {
            max_retries: crate::consts::MAX_RETRIES,
            card_poll_timeout_ms: 0,
        };

        Self {
            state: State::Idle,
            cfg,
            retries: RetryState::new(cfg.max_retries),
            channel: SecureChannel::new(),
            family_id: FamilyId::BLANK,
            transport,
            hooks,
            rng,
        }
    }

    /// Apply engine configuration
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self.retries = RetryState::new(cfg.max_retries);
        self
    }

    /// Fetch engine configuration
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Fetch engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Retries consumed by the most recent exchange
    pub fn retries(&self) -> u8 {
        self.retries.count()
    }

    /// Set the device key id quoted on secure channel commands
    pub fn set_device_key_id(&mut self, key_id: [u8; KEY_ID_SIZE]) {
        self.channel.set_key_id(key_id);
    }

    /// Set the secure channel session key
    pub fn set_session_key(&mut self, key: SessionKey) {
        self.channel.set_key(key);
    }

    /// Set the card family this device is bound to
    pub fn set_family_id(&mut self, family_id: FamilyId) {
        self.family_id = family_id;
    }

    /// Card family this device is bound to ([FamilyId::BLANK] until the first selection)
    pub fn family_id(&self) -> &FamilyId {
        &self.family_id
    }

    /// Access the underlying transport
    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Tear down the session, dropping key material
    pub fn reset(&mut self) {
        self.channel.clear();
        self.retries.reset();
        self.state = State::Idle;
    }

    /// Wait for a card to enter the field
    ///
    /// Polls until a card is detected, yielding between polls. Returns
    /// [Error::Aborted] (after invoking the abort hook) once cancelled.
    pub fn select_card(&mut self) -> Result<(), Error> {
        loop {
            match self.transport.detect_card(self.cfg.card_poll_timeout_ms) {
                Ok(()) => {
                    #[cfg(feature = "log")]
                    log::debug!("card detected");

                    return Ok(());
                }
                Err(_e) => {
                    #[cfg(feature = "log")]
                    log::trace!("card detection: {}", _e);
                }
            }

            if self.hooks.cancelled() {
                #[cfg(feature = "log")]
                log::debug!("card selection cancelled");

                self.hooks.abort();
                self.state = State::Aborted;
                return Err(Error::Aborted);
            }

            self.hooks.yield_now();
        }
    }

    /// Single card detection attempt, waiting up to `timeout_ms`
    pub fn wait_for_card(&mut self, timeout_ms: u16) -> Result<(), Error> {
        self.transport.detect_card(timeout_ms)?;
        Ok(())
    }

    /// Exchange a command with the card
    ///
    /// On success `resp` holds the response payload followed by the final
    /// status word, which is also returned. `cmd` is zeroed on every exit,
    /// `resp` is zeroed on failure.
    ///
    /// The capacity of `resp` ([MAX_RESPONSE_LEN][crate::consts::MAX_RESPONSE_LEN])
    /// bounds the accumulated response, payload and status word included.
    /// Any frame or continuation chunk that would exceed it aborts the
    /// exchange with [Error::ResponseTooLong].
    pub fn exchange(
        &mut self,
        mode: ChannelMode,
        cmd: &mut Command,
        resp: &mut Response,
    ) -> Result<StatusWord, Error> {
        self.retries.reset();
        self.state = State::Build;

        let r = self.exchange_inner(mode, cmd, resp);

        cmd.clear();

        match r {
            Ok(sw) => {
                self.transport.clear_buffers();
                self.state = State::Done;

                #[cfg(feature = "log")]
                log::debug!("exchange complete: {} ({} bytes)", sw, resp.len());
            }
            Err(_e) => {
                resp.clear();
                self.state = State::Aborted;

                #[cfg(feature = "log")]
                log::error!("exchange aborted: {}", _e);
            }
        }

        r
    }

    fn exchange_inner(
        &mut self,
        mode: ChannelMode,
        cmd: &mut Command,
        resp: &mut Response,
    ) -> Result<StatusWord, Error> {
        if cmd.len() < HEADER_LEN {
            return Err(Error::InvalidLength);
        }
        if cmd.len() > MAX_COMMAND_LEN {
            return Err(Error::CommandTooLong);
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&cmd[..HEADER_LEN]);

        #[cfg(feature = "log")]
        log::debug!(
            "exchange {:02x?} ({} bytes, {:?})",
            header,
            cmd.len(),
            mode
        );

        if mode == ChannelMode::Secure {
            self.channel.seal_command(cmd, &mut self.rng)?;
        }

        resp.clear();

        let mut rx = Zeroizing::new([0u8; RECV_PACKET_MAX_ENC_LEN]);

        // Send frames, fetching the response to the last
        let n = self.send_fragments(&header, cmd, &mut rx[..])?;

        let n = self.open_frame(mode, &mut rx[..], n)?;
        if n > resp.capacity() {
            return Err(Error::ResponseTooLong);
        }
        resp.extend_from_slice(&rx[..n])?;
        rx.zeroize();

        // Fetch remaining chunks
        self.continue_response(mode, resp, &mut rx[..])?;

        self.state = State::Decode;
        reassemble::held_status(resp)
    }

    fn send_fragments(
        &mut self,
        header: &[u8; HEADER_LEN],
        cmd: &[u8],
        rx: &mut [u8],
    ) -> Result<usize, Error> {
        let mut frame = Zeroizing::new([0u8; FRAME_LEN]);
        let mut n = 0;

        for f in Fragments::new(cmd)? {
            self.state = State::SendFragment(f.index);

            let frame_len = f.write(header, &mut frame[..])?;

            #[cfg(feature = "log")]
            log::debug!(
                "frame {}/{} tag 0x{:02x} ({} bytes)",
                f.index,
                f.total,
                f.tag(),
                frame_len
            );

            n = self.transfer(&frame[..frame_len], rx)?;

            if f.is_last() {
                break;
            }

            self.state = State::AwaitAck(f.index);

            if let Err(e) = fragment::check_ack(&rx[..n], f.remaining) {
                #[cfg(feature = "log")]
                log::error!(
                    "invalid ack {:02x?} for frame {}/{} ({} bytes remaining)",
                    &rx[..n],
                    f.index,
                    f.total,
                    f.remaining
                );

                return Err(e);
            }
        }

        self.state = State::AwaitResponse;

        if n < STATUS_LEN {
            #[cfg(feature = "log")]
            log::error!("malformed response ({} bytes)", n);

            return Err(Error::MalformedResponse);
        }

        Ok(n)
    }

    fn continue_response(
        &mut self,
        mode: ChannelMode,
        resp: &mut Response,
        rx: &mut [u8],
    ) -> Result<(), Error> {
        loop {
            let sw = reassemble::held_status(resp)?;
            if !sw.is_more_data() {
                return Ok(());
            }

            let req = reassemble::continuation(resp.len());
            self.state = State::Continuation(req.index);

            #[cfg(feature = "log")]
            log::debug!("continuation {} ({} more bytes)", req.index, sw.sw2());

            let n = self.transfer(&req.to_bytes(), rx)?;
            if n < STATUS_LEN {
                #[cfg(feature = "log")]
                log::error!("malformed continuation ({} bytes)", n);

                return Err(Error::MalformedResponse);
            }

            let n = self.open_frame(mode, rx, n)?;
            let sw = reassemble::append(resp, &rx[..n])?;
            rx[..n].zeroize();

            // A chunk without payload must end the response
            if n == STATUS_LEN && sw.is_more_data() {
                #[cfg(feature = "log")]
                log::error!("empty continuation chunk reporting {}", sw);

                return Err(Error::ProtocolDesync);
            }
        }
    }

    /// Exchange a single frame, retrying transient reader errors
    fn transfer(&mut self, frame: &[u8], rx: &mut [u8]) -> Result<usize, Error> {
        loop {
            match self.transport.exchange(frame, rx) {
                Ok(n) if n > rx.len() => return Err(Error::ResponseTooLong),
                Ok(n) => return Ok(n),
                Err(e) => match self.retries.classify(e) {
                    Retry::Again => continue,
                    Retry::Fail => return Err(Error::Transport(e)),
                },
            }
        }
    }

    fn open_frame(&mut self, mode: ChannelMode, rx: &mut [u8], n: usize) -> Result<usize, Error> {
        match mode {
            ChannelMode::Plain => Ok(n),
            ChannelMode::Secure => self.channel.open_response(rx, n),
        }
    }
}

impl<T: Transport, H: Hooks, RNG: CryptoRngCore> Drop for Engine<T, H, RNG> {
    fn drop(&mut self) {
        self.channel.clear();
    }
}
