#![allow(unused)]

use std::collections::VecDeque;

use encdec::{Decode, DecodeOwned, Encode};
use log::{debug, trace};
use rand::{rngs::OsRng, RngCore};

use x1_card_core::{
    aead,
    apdu::{
        card::{CardInfo, FamilyId, KEY_ID_SIZE},
        challenge::{ChallengeResp, VerifyChallengeReq},
        data::TlvResp,
        status::STATUS_LEN,
        wallet::{WalletEntry, WalletList, WalletLookup, WalletSummary, NAME_SIZE},
        Instruction, StatusWord,
    },
    consts::{
        CHAIN_FIRST, CHAIN_LAST, CHAIN_MIDDLE, HEADER_LEN, KEY_LEN, NONCE_LEN,
        RECV_PACKET_MAX_LEN, SECURE_RESP_OVERHEAD, TAG_LEN,
    },
    engine::{HalError, Hooks, Transport},
};

/// Echo instruction, plain channel
pub const INS_ECHO: u8 = 0xE0;

/// Echo instruction, secure channel
pub const INS_ECHO_SECURE: u8 = 0xE1;

/// Session key shared by device and simulated card
pub const SESSION_KEY: [u8; KEY_LEN] = [0x4b; KEY_LEN];

/// Key id reported by simulated cards
pub const KEY_ID: [u8; KEY_ID_SIZE] = [0x0a, 0x0b, 0x0c, 0x0d];

/// Tag used by the simulated card for signatures
pub const TAG_SIGNATURE: u8 = 0x30;

/// Tag used by the simulated card for inheritance data
pub const TAG_INHERITANCE: u8 = 0x40;

pub fn init_log() {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());
}

/// Transport replaying scripted responses, recording sent frames
#[derive(Default)]
pub struct ScriptedTransport {
    pub frames: Vec<Vec<u8>>,
    pub responses: VecDeque<Result<Vec<u8>, HalError>>,
    pub detect: VecDeque<Result<(), HalError>>,
    pub detect_calls: usize,
    pub cleared: usize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, r: &[u8]) -> Self {
        self.responses.push_back(Ok(r.to_vec()));
        self
    }

    pub fn fail(mut self, e: HalError) -> Self {
        self.responses.push_back(Err(e));
        self
    }
}

impl Transport for ScriptedTransport {
    fn exchange(&mut self, frame: &[u8], resp: &mut [u8]) -> Result<usize, HalError> {
        trace!("frame: {:02x?}", frame);
        self.frames.push(frame.to_vec());

        // Unscripted exchanges fail as a card that left the field would
        let r = self
            .responses
            .pop_front()
            .unwrap_or(Err(HalError::CardDisappeared))?;

        resp[..r.len()].copy_from_slice(&r);
        Ok(r.len())
    }

    fn detect_card(&mut self, _timeout_ms: u16) -> Result<(), HalError> {
        self.detect_calls += 1;
        self.detect.pop_front().unwrap_or(Err(HalError::Timeout))
    }

    fn clear_buffers(&mut self) {
        self.cleared += 1;
    }
}

/// Hooks counting calls, cancelling after a number of polls
#[derive(Default)]
pub struct TestHooks {
    pub cancel_after: Option<usize>,
    pub polls: usize,
    pub aborts: usize,
    pub yields: usize,
}

impl Hooks for TestHooks {
    fn cancelled(&mut self) -> bool {
        self.polls += 1;
        matches!(self.cancel_after, Some(n) if self.polls >= n)
    }

    fn abort(&mut self) {
        self.aborts += 1;
    }

    fn yield_now(&mut self) {
        self.yields += 1;
    }
}

/// Simulated X1 card applet
///
/// Reassembles chained command frames, opens / seals secure channel payloads
/// and returns chunked responses via `0x61XX` continuation.
pub struct SimCard {
    pub info: CardInfo,
    pub key: [u8; KEY_LEN],

    pub wallets: Vec<WalletEntry>,

    /// Reader faults to inject ahead of frame handling
    pub faults: VecDeque<HalError>,

    /// Override the buffer space reported on acks
    pub ack_space: Option<u8>,

    /// Flip a byte in the numbered (from zero) response frame carrying payload
    pub tamper: Option<usize>,

    /// Last reassembled command (header and body, as sent)
    pub last_command: Vec<u8>,

    /// Frames received
    pub frames: Vec<Vec<u8>>,

    /// Continuation indices requested
    pub continuations: Vec<u8>,

    pub detected: usize,
    pub cleared: usize,

    chain: Vec<u8>,
    pending: VecDeque<Vec<u8>>,
    secure: bool,
}

impl SimCard {
    pub fn new(card_number: u8, family_id: [u8; 4]) -> Self {
        Self {
            info: CardInfo {
                version: [0x02, 0x05],
                family_id: FamilyId(family_id),
                card_number,
                key_id: KEY_ID,
            },
            key: SESSION_KEY,
            wallets: vec![],
            faults: VecDeque::new(),
            ack_space: None,
            tamper: None,
            last_command: vec![],
            frames: vec![],
            continuations: vec![],
            detected: 0,
            cleared: 0,
            chain: vec![],
            pending: VecDeque::new(),
            secure: false,
        }
    }

    fn is_secure(ins: u8) -> bool {
        const SECURE: &[Instruction] = &[
            Instruction::Unpair,
            Instruction::AddWallet,
            Instruction::RetrieveWallet,
            Instruction::DeleteWallet,
            Instruction::ListWallet,
            Instruction::GetChallenge,
            Instruction::VerifyChallenge,
            Instruction::Inheritance,
        ];

        ins == INS_ECHO_SECURE || SECURE.iter().any(|i| *i as u8 == ins)
    }

    /// Card-side handling of a complete command, returning the plaintext
    /// response payload and status word
    fn handle(&mut self, ins: u8, p1: u8, body: &[u8]) -> (Vec<u8>, StatusWord) {
        let mut buff = [0u8; 600];

        let ins = match Instruction::try_from(ins) {
            Ok(i) => i,
            Err(_) if ins == INS_ECHO || ins == INS_ECHO_SECURE => {
                return (body.to_vec(), StatusWord::NO_ERROR)
            }
            Err(_) => return (vec![], StatusWord::INS_NOT_SUPPORTED),
        };

        match ins {
            Instruction::Select => {
                let n = self.info.encode(&mut buff).unwrap();
                (buff[..n].to_vec(), StatusWord::NO_ERROR)
            }
            Instruction::Pair => {
                let mut r = body.to_vec();
                r.reverse();
                (r, StatusWord::NO_ERROR)
            }
            Instruction::Unpair => (vec![], StatusWord::NO_ERROR),
            Instruction::AddWallet => {
                let (e, _) = WalletEntry::decode(body).unwrap();
                if self.wallets.iter().any(|w| w.name == e.name) {
                    return (vec![], StatusWord::WRONG_DATA);
                }
                if self.wallets.len() >= 4 {
                    return (vec![], StatusWord::NOT_ENOUGH_MEMORY);
                }
                self.wallets.push(e);
                (vec![], StatusWord::NO_ERROR)
            }
            Instruction::RetrieveWallet | Instruction::DeleteWallet => {
                let (l, _) = WalletLookup::decode(body).unwrap();

                let i = match self.wallets.iter().position(|w| w.name == l.name) {
                    Some(i) => i,
                    None => return (vec![], StatusWord::RECORD_NOT_FOUND),
                };
                if self.wallets[i].password_double_hash != l.password_double_hash {
                    return (vec![], StatusWord::SECURITY_STATUS_NOT_SATISFIED);
                }

                if ins == Instruction::DeleteWallet {
                    self.wallets.remove(i);
                    return (vec![], StatusWord::NO_ERROR);
                }

                let n = self.wallets[i].encode(&mut buff).unwrap();
                (buff[..n].to_vec(), StatusWord::NO_ERROR)
            }
            Instruction::ListWallet => {
                let s: Vec<_> = self
                    .wallets
                    .iter()
                    .map(|w| WalletSummary {
                        name: w.name,
                        info: w.info,
                    })
                    .collect();
                let n = WalletList::new(&s).unwrap().encode(&mut buff).unwrap();
                (buff[..n].to_vec(), StatusWord::NO_ERROR)
            }
            Instruction::Ecdsa => {
                // Signature stand-in: data repeated to signature length
                let sig: Vec<u8> = body[2..].iter().cycle().take(72).copied().collect();
                let n = TlvResp::new(TAG_SIGNATURE, &sig).encode(&mut buff).unwrap();
                (buff[..n].to_vec(), StatusWord::NO_ERROR)
            }
            Instruction::GetChallenge => {
                let c = ChallengeResp {
                    target: [0x0f; 32],
                    random_number: [0xf0; 32],
                };
                let n = c.encode(&mut buff).unwrap();
                (buff[..n].to_vec(), StatusWord::NO_ERROR)
            }
            Instruction::VerifyChallenge => {
                let (v, _) = VerifyChallengeReq::decode(body).unwrap();
                match v.nonce == [0x01; 32] {
                    true => (vec![], StatusWord::NO_ERROR),
                    false => (vec![], StatusWord::WRONG_DATA),
                }
            }
            Instruction::Inheritance => {
                // Name, length prefixed data
                let data = &body[NAME_SIZE + 1..];
                let out: Vec<u8> = data.iter().map(|b| b ^ 0x5a).collect();
                let n = TlvResp::new(TAG_INHERITANCE, &out).encode(&mut buff).unwrap();
                (buff[..n].to_vec(), StatusWord::NO_ERROR)
            }
            Instruction::GetResponse => (vec![], StatusWord::INS_NOT_SUPPORTED),
        }
    }

    /// Open a sealed command body (`C || nonce || tag || key_id`)
    fn open_command(&self, ins: u8, p1: u8, p2: u8, sealed: &[u8]) -> Option<Vec<u8>> {
        let (rest, key_id) = sealed.split_at(sealed.len().checked_sub(KEY_ID_SIZE)?);
        if key_id != self.info.key_id {
            return None;
        }
        if rest.is_empty() {
            return Some(vec![]);
        }

        let c_len = rest.len().checked_sub(NONCE_LEN + TAG_LEN)?;
        let mut body = rest[..c_len].to_vec();
        let nonce: [u8; NONCE_LEN] = rest[c_len..][..NONCE_LEN].try_into().unwrap();
        let tag: [u8; TAG_LEN] = rest[c_len + NONCE_LEN..].try_into().unwrap();

        aead::open(&self.key, &nonce, &[ins, p1, p2], &mut body, &tag).ok()?;

        Some(body)
    }

    /// Split a response into frames, sealing each where required
    fn queue_response(&mut self, payload: &[u8], sw: StatusWord) {
        self.pending.clear();

        let max = match self.secure {
            true => RECV_PACKET_MAX_LEN - SECURE_RESP_OVERHEAD,
            false => RECV_PACKET_MAX_LEN - STATUS_LEN,
        };

        let chunks: Vec<&[u8]> = match payload.is_empty() {
            true => vec![&payload[..0]],
            false => payload.chunks(max).collect(),
        };

        let mut sent = 0;
        for (i, c) in chunks.iter().enumerate() {
            sent += c.len();

            let sw = match i == chunks.len() - 1 {
                true => sw,
                false => StatusWord::new(0x61, (payload.len() - sent).min(0xFF) as u8),
            };

            let mut f = c.to_vec();

            if self.secure && !c.is_empty() {
                let mut nonce = [0u8; NONCE_LEN];
                OsRng.fill_bytes(&mut nonce);

                let tag = aead::seal(&self.key, &nonce, &sw.to_bytes(), &mut f).unwrap();
                f.extend_from_slice(&nonce);
                f.extend_from_slice(&tag);
            }

            f.extend_from_slice(&sw.to_bytes());
            self.pending.push_back(f);
        }
    }

    fn next_frame(&mut self, resp: &mut [u8]) -> usize {
        let mut f = self
            .pending
            .pop_front()
            .unwrap_or_else(|| StatusWord::UNKNOWN.to_bytes().to_vec());

        if f.len() > STATUS_LEN {
            self.tamper = match self.tamper {
                Some(0) => {
                    f[0] ^= 0x01;
                    None
                }
                Some(n) => Some(n - 1),
                None => None,
            };
        }

        resp[..f.len()].copy_from_slice(&f);
        f.len()
    }
}

impl Transport for SimCard {
    fn exchange(&mut self, frame: &[u8], resp: &mut [u8]) -> Result<usize, HalError> {
        if let Some(e) = self.faults.pop_front() {
            debug!("injecting fault: {e:?}");
            return Err(e);
        }

        self.frames.push(frame.to_vec());

        // Continuation request
        if frame.len() == 4 && frame[1] == Instruction::GetResponse as u8 {
            self.continuations.push(frame[2]);
            return Ok(self.next_frame(resp));
        }

        let (tag, ins, p1, p2, lc) = (frame[0], frame[1], frame[2], frame[3], frame[4]);
        let chunk = &frame[HEADER_LEN..];
        assert_eq!(lc as usize, chunk.len(), "frame length mismatch");

        if tag == CHAIN_FIRST || tag == CHAIN_MIDDLE {
            assert!(tag == CHAIN_MIDDLE || self.chain.is_empty());
            self.chain.extend_from_slice(chunk);

            resp[0] = 0x00;
            resp[1] = self.ack_space.unwrap_or(0xFF);
            return Ok(2);
        }

        assert_eq!(tag, CHAIN_LAST, "unexpected chain tag");
        self.chain.extend_from_slice(chunk);

        let body = core::mem::take(&mut self.chain);

        self.last_command = vec![0x00, ins, p1, p2, body.len() as u8];
        self.last_command.extend_from_slice(&body);

        self.secure = Self::is_secure(ins);

        let (payload, sw) = match self.secure {
            true => match self.open_command(ins, p1, p2, &body) {
                Some(b) => self.handle(ins, p1, &b),
                None => (vec![], StatusWord::SECURITY_STATUS_NOT_SATISFIED),
            },
            false => self.handle(ins, p1, &body),
        };

        debug!("card response: {} ({} bytes)", sw, payload.len());

        self.queue_response(&payload, sw);
        Ok(self.next_frame(resp))
    }

    fn detect_card(&mut self, _timeout_ms: u16) -> Result<(), HalError> {
        self.detected += 1;
        Ok(())
    }

    fn clear_buffers(&mut self) {
        self.cleared += 1;
    }
}
