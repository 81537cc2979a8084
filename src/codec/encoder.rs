use crate::{
    capture::RawAudioChunk,
    constants::*,
    error::Result,
    settings::ChannelMode,
};
use audiopus::{coder::Encoder as OpusEncoder, Application as CodingMode};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// One Opus frame awaiting transmission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodedChunk(Box<[u8]>);

impl EncodedChunk {
    /// Wraps encoded bytes.
    pub fn new(data: Box<[u8]>) -> Self {
        Self(data)
    }

    /// Encoded bytes.
    pub fn data(&self) -> &[u8] {
        &self.0
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this chunk holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Stateful Opus encoder bound to a fixed frame size and channel count.
///
/// Captured chunks are accumulated until a whole frame is available; each
/// frame becomes one [`EncodedChunk`] on the pending queue, drained later
/// by the packetizer.
#[derive(Debug)]
pub struct EncoderPipeline {
    encoder: OpusEncoder,
    mode: ChannelMode,
    frame: Vec<i16>,
    scratch: Box<[u8]>,
    pending: VecDeque<EncodedChunk>,
    pending_bytes: usize,
    frames_dropped: u64,
}

impl EncoderPipeline {
    /// Builds a new encoder.
    ///
    /// Failure here is fatal to voice capture.
    pub fn new(mode: ChannelMode) -> Result<Self> {
        Ok(Self {
            encoder: Self::make_encoder(mode)?,
            mode,
            frame: Vec::with_capacity(mode.sample_count_in_frame()),
            scratch: vec![0u8; MAX_OPUS_PACKET].into_boxed_slice(),
            pending: VecDeque::new(),
            pending_bytes: 0,
            frames_dropped: 0,
        })
    }

    fn make_encoder(mode: ChannelMode) -> Result<OpusEncoder> {
        Ok(OpusEncoder::new(SAMPLE_RATE, mode.to_opus(), CodingMode::Voip)?)
    }

    /// Rebuilds the encoder for a new channel count.
    ///
    /// Opus cannot change channel count mid-stream, so any partially
    /// accumulated frame is discarded. Already encoded frames remain pending.
    /// On failure the existing encoder is kept.
    pub fn reset(&mut self, mode: ChannelMode) -> Result<()> {
        let encoder = Self::make_encoder(mode)?;
        debug!("Rebuilt encoder: {:?} -> {:?}.", self.mode, mode);

        self.encoder = encoder;
        self.mode = mode;
        self.frame = Vec::with_capacity(mode.sample_count_in_frame());
        Ok(())
    }

    /// Channel layout currently being encoded.
    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    /// Discards any partially accumulated frame.
    pub fn clear_partial(&mut self) {
        self.frame.clear();
    }

    /// Feeds a captured chunk, encoding each frame it completes.
    ///
    /// `device_channels` describes the chunk's interleaving; audio is
    /// downmixed or duplicated to match the encoder. `input_volume` scales
    /// samples before encoding. Returns the number of frames encoded.
    pub fn push_chunk(
        &mut self,
        chunk: &mut RawAudioChunk,
        device_channels: usize,
        input_volume: f32,
    ) -> usize {
        let frame_len = self.mode.sample_count_in_frame();
        let enc_channels = self.mode.channels();
        let mut encoded = 0;

        while !chunk.is_exhausted() {
            let missing = frame_len - self.frame.len();

            if device_channels == enc_channels {
                chunk.take_samples(&mut self.frame, missing);
            } else if !self.take_converted(chunk, device_channels, missing) {
                break;
            }

            if self.frame.len() == frame_len {
                if self.encode_frame(input_volume) {
                    encoded += 1;
                }
                self.frame.clear();
            }
        }

        encoded
    }

    // Pulls one device frame at a time and reshapes it to the encoder's layout.
    // Returns false if the chunk ended mid device frame.
    fn take_converted(
        &mut self,
        chunk: &mut RawAudioChunk,
        device_channels: usize,
        missing: usize,
    ) -> bool {
        let enc_channels = self.mode.channels();
        let mut written = 0;

        while written < missing {
            if chunk.remaining() < device_channels {
                if !chunk.is_exhausted() {
                    trace!("Dropping {} trailing samples.", chunk.remaining());
                    while chunk.take_sample().is_ok() {}
                }
                return false;
            }

            let mut sum = 0i32;
            let mut first = 0i16;
            for c in 0..device_channels {
                let s = match chunk.take_sample() {
                    Ok(s) => s,
                    Err(_) => return false,
                };
                if c == 0 {
                    first = s;
                }
                sum += i32::from(s);
            }

            if enc_channels == 1 {
                self.frame.push((sum / device_channels as i32) as i16);
            } else {
                let s = if device_channels == 1 {
                    first
                } else {
                    (sum / device_channels as i32) as i16
                };
                for _ in 0..enc_channels {
                    self.frame.push(s);
                }
            }

            written += enc_channels;
        }

        true
    }

    fn encode_frame(&mut self, input_volume: f32) -> bool {
        if (input_volume - 1.0).abs() > f32::EPSILON {
            for s in &mut self.frame {
                *s = (f32::from(*s) * input_volume)
                    .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
            }
        }

        match self.encoder.encode(&self.frame, &mut self.scratch[..]) {
            Ok(len) => {
                self.pending_bytes += len;
                self.pending
                    .push_back(EncodedChunk::new(self.scratch[..len].into()));
                true
            },
            Err(e) => {
                self.frames_dropped += 1;
                warn!("Dropping frame which failed to encode: {:?}.", e);
                false
            },
        }
    }

    /// Removes the oldest pending chunk.
    pub fn pop_pending(&mut self) -> Option<EncodedChunk> {
        let out = self.pending.pop_front();
        if let Some(c) = &out {
            self.pending_bytes -= c.len();
        }
        out
    }

    /// Peeks at the oldest pending chunk.
    pub fn peek_pending(&self) -> Option<&EncodedChunk> {
        self.pending.front()
    }

    /// Number of encoded chunks awaiting transmission.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total size of encoded chunks awaiting transmission.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// Number of frames lost to encoder errors.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}
