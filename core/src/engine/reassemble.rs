// Copyright (c) 2023 The X1 Card Developers

//! Response reassembly
//!
//! Responses longer than a single frame are returned in chunks, each ending
//! with a `0x61XX` status word while more data remains. The accumulated
//! response holds the chunk payloads back to back, followed by the status word
//! of the most recent chunk.

use super::Error;
use crate::{
    apdu::{
        status::{ContinuationReq, STATUS_LEN},
        StatusWord,
    },
    consts::RECV_PACKET_MAX_LEN,
    scratch::Response,
};

/// Continuation request for the next chunk, given the accumulated response length
/// (payload and held status word)
pub fn continuation(received: usize) -> ContinuationReq {
    ContinuationReq::new((received / RECV_PACKET_MAX_LEN + 1) as u8)
}

/// Status word held at the tail of an accumulated response
pub fn held_status(resp: &[u8]) -> Result<StatusWord, Error> {
    StatusWord::from_trailer(resp).ok_or(Error::MalformedResponse)
}

/// Append a decoded chunk (`payload || SW`) to the accumulated response,
/// replacing the held status word, returning the chunk status
pub fn append(resp: &mut Response, chunk: &[u8]) -> Result<StatusWord, Error> {
    let sw = StatusWord::from_trailer(chunk).ok_or(Error::MalformedResponse)?;

    let held = resp.len().min(STATUS_LEN);
    if resp.len() - held + chunk.len() > resp.capacity() {
        return Err(Error::ResponseTooLong);
    }

    resp.truncate(resp.len() - held);
    resp.extend_from_slice(chunk)?;

    Ok(sw)
}
