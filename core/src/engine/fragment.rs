// Copyright (c) 2023 The X1 Card Developers

//! Command fragmentation
//!
//! Commands are split into frames carrying at most [SEND_PACKET_MAX_LEN] body
//! bytes. Each frame repeats the command header with the class byte replaced by
//! a chain tag and the length byte replaced by the frame body length:
//!
//! ```text
//! +-----------+-------+-------+-------+-----------+---------------+
//! | CHAIN_TAG |  INS  |  P1   |  P2   | FRAME_LEN |  CHUNK ...    |
//! +-----------+-------+-------+-------+-----------+---------------+
//! ```
//!
//! The number of frames is computed over the full command (header included),
//! so the last frame of a command may carry an empty chunk.

use super::Error;
use crate::consts::{
    ACK_ANY, CHAIN_FIRST, CHAIN_LAST, CHAIN_MIDDLE, HEADER_LEN, MAX_COMMAND_LEN,
    SEND_PACKET_MAX_LEN,
};
use crate::apdu::{status::STATUS_LEN, OFFSET_INS, OFFSET_LC, OFFSET_P2};

/// Number of frames for a command of `command_len` bytes (header included)
pub fn total_packets(command_len: usize) -> usize {
    command_len.div_ceil(SEND_PACKET_MAX_LEN).max(1)
}

/// Chain tag for (1-based) frame `index` of `total`
pub fn chain_tag(index: usize, total: usize) -> u8 {
    if index == total {
        CHAIN_LAST
    } else if index == 1 {
        CHAIN_FIRST
    } else {
        CHAIN_MIDDLE
    }
}

/// Single command frame
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Fragment<'a> {
    /// 1-based frame index
    pub index: usize,

    /// Total frames in this command
    pub total: usize,

    /// Body bytes carried by this frame
    pub chunk: &'a [u8],

    /// Body bytes remaining after this frame
    pub remaining: usize,
}

impl<'a> Fragment<'a> {
    /// Check whether this is the final frame
    pub fn is_last(&self) -> bool {
        self.index == self.total
    }

    /// Chain tag for this frame
    pub fn tag(&self) -> u8 {
        chain_tag(self.index, self.total)
    }

    /// Write the frame using the provided command header, returning the frame length
    pub fn write(&self, header: &[u8; HEADER_LEN], buff: &mut [u8]) -> Result<usize, Error> {
        let n = HEADER_LEN + self.chunk.len();
        if buff.len() < n {
            return Err(Error::InvalidLength);
        }

        buff[0] = self.tag();
        buff[OFFSET_INS..=OFFSET_P2].copy_from_slice(&header[OFFSET_INS..=OFFSET_P2]);
        buff[OFFSET_LC] = self.chunk.len() as u8;
        buff[HEADER_LEN..n].copy_from_slice(self.chunk);

        Ok(n)
    }
}

/// Iterator over the frames of a command
#[derive(Clone, Debug)]
pub struct Fragments<'a> {
    body: &'a [u8],
    index: usize,
    total: usize,
}

impl<'a> Fragments<'a> {
    /// Split a full command (header and body)
    pub fn new(command: &'a [u8]) -> Result<Self, Error> {
        if command.len() < HEADER_LEN {
            return Err(Error::InvalidLength);
        }
        if command.len() > MAX_COMMAND_LEN {
            return Err(Error::CommandTooLong);
        }

        Ok(Self {
            body: &command[HEADER_LEN..],
            index: 0,
            total: total_packets(command.len()),
        })
    }

    /// Total frames in this command
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }

        let offset = (self.index * SEND_PACKET_MAX_LEN).min(self.body.len());
        let end = (offset + SEND_PACKET_MAX_LEN).min(self.body.len());

        self.index += 1;

        Some(Fragment {
            index: self.index,
            total: self.total,
            chunk: &self.body[offset..end],
            remaining: self.body.len() - end,
        })
    }
}

/// Check a card acknowledgement for a non-final frame
///
/// Acks are exactly two bytes, the second of which is [ACK_ANY] or the
/// card buffer space, which must cover the remaining body bytes.
pub fn check_ack(ack: &[u8], remaining: usize) -> Result<(), Error> {
    if ack.len() != STATUS_LEN {
        return Err(Error::ProtocolDesync);
    }

    match ack[1] {
        ACK_ANY => Ok(()),
        v if v as usize >= remaining => Ok(()),
        _ => Err(Error::ProtocolDesync),
    }
}
