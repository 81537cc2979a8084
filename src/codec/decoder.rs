use crate::{
    constants::*,
    error::{Error, Result},
    settings::ChannelMode,
};
use audiopus::{
    coder::Decoder as OpusDecoder,
    error::{Error as OpusError, ErrorCode},
};
use std::convert::TryInto;
use tracing::error;

/// Reads the channel count declared by an Opus frame's TOC byte.
pub fn frame_channels(frame: &[u8]) -> Option<usize> {
    frame
        .first()
        .map(|toc| if toc & 0b0000_0100 != 0 { 2 } else { 1 })
}

/// The pair of decoders owned by each speaker.
///
/// Frames are routed to the mono or stereo decoder according to their TOC,
/// and decoded output is always presented as interleaved stereo.
#[derive(Debug)]
pub struct SpeakerDecoders {
    mono: OpusDecoder,
    stereo: OpusDecoder,
    raw: Box<[i16]>,
    out: Vec<i16>,
}

impl SpeakerDecoders {
    /// Builds both decoders.
    pub fn new() -> Result<Self> {
        Ok(Self {
            mono: OpusDecoder::new(SAMPLE_RATE, ChannelMode::Mono.to_opus())?,
            stereo: OpusDecoder::new(SAMPLE_RATE, ChannelMode::Stereo.to_opus())?,
            raw: vec![0; MAX_DECODED_FRAME_SIZE].into_boxed_slice(),
            out: Vec::with_capacity(MAX_DECODED_FRAME_SIZE),
        })
    }

    /// Decodes one frame with the decoder matching its TOC.
    pub fn decode(&mut self, frame: &[u8]) -> Result<&[i16]> {
        let mode = frame_channels(frame)
            .and_then(ChannelMode::from_channels)
            .ok_or(Error::IllegalVoicePacket)?;
        self.decode_as(mode, frame)
    }

    /// Decodes one frame with a specific decoder.
    ///
    /// A frame encoded with a different channel count is rejected with
    /// [`Error::ChannelMismatch`] and leaves decoder state untouched.
    pub fn decode_as(&mut self, mode: ChannelMode, frame: &[u8]) -> Result<&[i16]> {
        let found = frame_channels(frame).ok_or(Error::IllegalVoicePacket)?;
        if found != mode.channels() {
            return Err(Error::ChannelMismatch {
                expected: mode.channels() as u8,
                found: found as u8,
            });
        }

        let decoder = match mode {
            ChannelMode::Mono => &mut self.mono,
            ChannelMode::Stereo => &mut self.stereo,
        };

        let per_channel = decoder
            .decode(
                Some(frame.try_into()?),
                (&mut self.raw[..]).try_into()?,
                false,
            )
            .map_err(|e| {
                if let OpusError::Opus(ErrorCode::BufferTooSmall) = e {
                    error!("Received frame larger than Opus standard maximum.");
                }
                e
            })?;

        self.out.clear();
        match mode {
            ChannelMode::Mono => {
                for s in &self.raw[..per_channel] {
                    self.out.push(*s);
                    self.out.push(*s);
                }
            },
            ChannelMode::Stereo => self.out.extend_from_slice(&self.raw[..2 * per_channel]),
        }

        Ok(&self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capture::RawAudioChunk, codec::EncoderPipeline};

    fn encode(mode: ChannelMode, samples: Vec<i16>, device_channels: usize) -> Vec<Vec<u8>> {
        let mut enc = EncoderPipeline::new(mode).unwrap();
        let mut chunk = RawAudioChunk::new(samples.into_boxed_slice());
        enc.push_chunk(&mut chunk, device_channels, 1.0);

        let mut out = vec![];
        while let Some(c) = enc.pop_pending() {
            out.push(c.data().to_vec());
        }
        out
    }

    #[test]
    fn round_trip_preserves_duration() {
        let n_frames = 25;
        let frames = encode(
            ChannelMode::Mono,
            utils::make_sine_at(n_frames * MONO_FRAME_SIZE, false, 0.5),
            1,
        );
        assert_eq!(frames.len(), n_frames);

        let mut dec = SpeakerDecoders::new().unwrap();
        let mut decoded = vec![];
        for f in &frames {
            decoded.extend_from_slice(dec.decode(f).unwrap());
        }

        // Mono is presented as stereo.
        assert_eq!(decoded.len(), n_frames * STEREO_FRAME_SIZE);

        // Skip codec warm-up, then compare energy against the source.
        let settled = &decoded[5 * STEREO_FRAME_SIZE..];
        let level = utils::rms(settled);
        let source = utils::rms(&utils::make_sine_at(MONO_FRAME_SIZE * 10, false, 0.5));
        assert!(
            (level - source).abs() < source * 0.25,
            "decoded rms {} vs source {}",
            level,
            source
        );
    }

    #[test]
    fn stereo_frames_decode_to_stereo() {
        let frames = encode(
            ChannelMode::Stereo,
            utils::make_sine(2 * MONO_FRAME_SIZE, true),
            2,
        );
        let mut dec = SpeakerDecoders::new().unwrap();
        assert_eq!(dec.decode(&frames[0]).unwrap().len(), STEREO_FRAME_SIZE);
    }

    #[test]
    fn channel_mismatch_is_rejected() {
        let frames = encode(
            ChannelMode::Stereo,
            utils::make_sine(MONO_FRAME_SIZE, true),
            2,
        );
        let mut dec = SpeakerDecoders::new().unwrap();

        let err = dec.decode_as(ChannelMode::Mono, &frames[0]).unwrap_err();
        assert!(matches!(
            err,
            Error::ChannelMismatch {
                expected: 1,
                found: 2
            }
        ));
        assert!(err.is_recoverable());

        // The pipeline keeps working afterwards.
        assert!(dec.decode(&frames[0]).is_ok());
    }

    #[test]
    fn empty_frame_is_illegal() {
        let mut dec = SpeakerDecoders::new().unwrap();
        assert!(matches!(dec.decode(&[]), Err(Error::IllegalVoicePacket)));
    }
}
