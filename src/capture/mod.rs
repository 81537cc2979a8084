//! Microphone capture: raw chunk storage, the capture queue, level
//! estimation and the speech-activity gate.

mod chunk;
mod gate;
mod level;
mod queue;

pub use self::{
    chunk::RawAudioChunk,
    gate::ActivityGate,
    level::{decibels, decibels_of_blocks, decibels_scaled},
    queue::CaptureQueue,
};
