use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// An owned block of captured PCM samples with a read cursor.
///
/// Samples are consumed from the front, either in bulk or one at a time.
/// `remaining` never increases; once it reaches zero the chunk is exhausted
/// and should be discarded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawAudioChunk {
    data: Box<[i16]>,
    offset: usize,
    remaining: usize,
}

impl RawAudioChunk {
    /// Wraps already-converted samples.
    pub fn new(data: Box<[i16]>) -> Self {
        let remaining = data.len();
        Self {
            data,
            offset: 0,
            remaining,
        }
    }

    /// Converts a little-endian byte stream from the audio driver.
    ///
    /// A trailing odd byte is ignored.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut data = vec![0i16; bytes.len() / 2].into_boxed_slice();
        LittleEndian::read_i16_into(&bytes[..data.len() * 2], &mut data);
        Self::new(data)
    }

    /// Appends up to `count` samples onto `out`, returning how many were moved.
    #[inline]
    pub fn take_samples(&mut self, out: &mut Vec<i16>, count: usize) -> usize {
        let to_read = count.min(self.remaining);
        out.extend_from_slice(&self.data[self.offset..self.offset + to_read]);
        self.offset += to_read;
        self.remaining -= to_read;
        to_read
    }

    /// Removes a single sample.
    ///
    /// Fails with [`Error::ChunkExhausted`] rather than reading out of bounds.
    #[inline]
    pub fn take_sample(&mut self) -> Result<i16> {
        if self.remaining == 0 {
            return Err(Error::ChunkExhausted);
        }

        let out = self.data[self.offset];
        self.offset += 1;
        self.remaining -= 1;
        Ok(out)
    }

    /// Unread samples, without consuming them.
    pub fn samples(&self) -> &[i16] {
        &self.data[self.offset..]
    }

    /// Number of unread samples.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Whether every sample has been read.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_read_little_endian() {
        let chunk = RawAudioChunk::from_le_bytes(&[0x01, 0x00, 0xff, 0xff, 0x7f]);
        assert_eq!(chunk.samples(), &[1, -1]);
        assert_eq!(chunk.remaining(), 2);
    }

    #[test]
    fn bulk_take_is_capped_by_remaining() {
        let mut chunk = RawAudioChunk::new(vec![1, 2, 3].into_boxed_slice());
        let mut out = vec![];

        assert_eq!(chunk.take_samples(&mut out, 2), 2);
        assert_eq!(chunk.take_samples(&mut out, 10), 1);
        assert_eq!(chunk.take_samples(&mut out, 10), 0);
        assert_eq!(out, vec![1, 2, 3]);
        assert!(chunk.is_exhausted());
    }

    #[test]
    fn single_take_fails_when_exhausted() {
        let mut chunk = RawAudioChunk::new(vec![7].into_boxed_slice());
        assert_eq!(chunk.take_sample().unwrap(), 7);
        assert!(matches!(chunk.take_sample(), Err(Error::ChunkExhausted)));
        assert_eq!(chunk.remaining(), 0);
    }

    #[test]
    fn mixed_takes_keep_order() {
        let mut chunk = RawAudioChunk::new(vec![1, 2, 3, 4].into_boxed_slice());
        let mut out = vec![];
        chunk.take_samples(&mut out, 1);
        out.push(chunk.take_sample().unwrap());
        chunk.take_samples(&mut out, 2);
        assert_eq!(out, vec![1, 2, 3, 4]);
    }
}
