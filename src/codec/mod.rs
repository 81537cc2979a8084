//! Opus encode and decode stages.

mod decoder;
mod encoder;

pub use self::{
    decoder::{frame_channels, SpeakerDecoders},
    encoder::{EncodedChunk, EncoderPipeline},
};
