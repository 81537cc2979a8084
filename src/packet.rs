//! Wire framing for voice packets, and the budgeted packetizer.
//!
//! A packet is a little-endian `u16` version followed by any number of
//! frames, each a little-endian `u16` length and that many bytes of Opus
//! data:
//!
//! ```text
//! +---------+-----+---------+-----+---------+-----
//! | version | len | frame.. | len | frame.. | ...
//! +---------+-----+---------+-----+---------+-----
//! ```
//!
//! The budget given to [`send`] bounds the whole packet, header and length
//! prefixes included.

use crate::{
    codec::EncoderPipeline,
    constants::*,
    error::{Error, Result},
};
use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

/// Bytes a frame of `len` bytes occupies on the wire.
#[inline]
pub const fn framed_len(len: usize) -> usize {
    FRAME_PREFIX_LEN + len
}

/// Drains pending frames from `pipeline` into `out`, oldest first.
///
/// Stops before the packet would exceed `budget` bytes; a frame which does
/// not fit stays pending for the next call and is never split. If not even
/// the first frame fits, nothing is written. Returns the number of frames
/// written.
pub fn send(pipeline: &mut EncoderPipeline, out: &mut Vec<u8>, budget: usize) -> usize {
    let mut used = PACKET_HEADER_LEN;
    let mut written = 0;

    while let Some(next) = pipeline.peek_pending() {
        let need = framed_len(next.len());
        if used + need > budget {
            break;
        }

        if written == 0 {
            out.reserve(budget.min(PACKET_HEADER_LEN + pipeline.pending_bytes() * 2));
            put_u16(out, VOICE_VERSION);
        }

        let chunk = match pipeline.pop_pending() {
            Some(c) => c,
            None => break,
        };

        put_u16(out, chunk.len() as u16);
        out.extend_from_slice(chunk.data());

        used += need;
        written += 1;
    }

    if written != 0 {
        trace!("Packed {} frames into {}/{} bytes.", written, used, budget);
    }

    written
}

#[inline]
fn put_u16(out: &mut Vec<u8>, val: u16) {
    let mut buf = [0u8; 2];
    LittleEndian::write_u16(&mut buf, val);
    out.extend_from_slice(&buf);
}

/// Iterator over the frames of a received packet.
#[derive(Clone, Debug)]
pub struct Frames<'a> {
    rest: &'a [u8],
    failed: bool,
}

/// Validates a packet's header and returns its frames.
pub fn frames(packet: &[u8]) -> Result<Frames<'_>> {
    if packet.len() < PACKET_HEADER_LEN {
        return Err(Error::IllegalVoicePacket);
    }

    let version = LittleEndian::read_u16(packet);
    if version != VOICE_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(Frames {
        rest: &packet[PACKET_HEADER_LEN..],
        failed: false,
    })
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() || self.failed {
            return None;
        }

        if self.rest.len() < FRAME_PREFIX_LEN {
            self.failed = true;
            return Some(Err(Error::IllegalVoicePacket));
        }

        let len = LittleEndian::read_u16(self.rest) as usize;
        let body = &self.rest[FRAME_PREFIX_LEN..];
        if len == 0 || body.len() < len {
            // Lengths can't be trusted past this point.
            self.failed = true;
            return Some(Err(Error::IllegalVoicePacket));
        }

        self.rest = &body[len..];
        Some(Ok(&body[..len]))
    }
}
