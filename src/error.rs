//! Engine, codec and device error handling.

use crate::id::SpeakerId;
use audiopus::Error as OpusError;
use serde_json::Error as JsonError;
use std::{error::Error as StdError, fmt};

/// Convenience type for voice engine error handling.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
#[non_exhaustive]
/// Errors produced by the voice engine.
pub enum Error {
    /// The Opus library failed to build a codec or to process a frame.
    Opus(OpusError),
    /// A frame's channel count did not match the decoder asked to handle it.
    ChannelMismatch {
        /// Channel count of the selected decoder.
        expected: u8,
        /// Channel count declared by the frame.
        found: u8,
    },
    /// Received a voice packet with truncated or empty framing.
    IllegalVoicePacket,
    /// Received a voice packet written with an unknown wire version.
    UnsupportedVersion(u16),
    /// A single sample was requested from an exhausted audio chunk.
    ChunkExhausted,
    /// The capture callback delivered a byte count which is not whole samples.
    CaptureFormat(usize),
    /// The mix destination is smaller than `frames * channels`.
    MixBuffer {
        /// Samples required by the requested frame and channel count.
        needed: usize,
        /// Samples available in the destination.
        available: usize,
    },
    /// The mix destination declared an unusable channel count.
    MixChannels(u16),
    /// The capture device could not be used.
    Device(DeviceError),
    /// A settings document could not be parsed.
    Settings(JsonError),
    /// The local speaker is already bound to another id for this session.
    LocalSpeakerBound(SpeakerId),
    /// The engine has not been (successfully) initialised, or was shut down.
    Uninitialised,
}

impl Error {
    /// Indicates whether this failure leaves voice capture disabled.
    ///
    /// Only codec construction failures are fatal; these are surfaced
    /// by [`Voice::init`] and channel mode changes.
    ///
    /// [`Voice::init`]: crate::Voice::init
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Opus(_) | Error::Uninitialised)
    }

    /// Indicates whether this failure affected a single frame or callback,
    /// with processing continuing afterwards.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ChannelMismatch { .. }
                | Error::IllegalVoicePacket
                | Error::UnsupportedVersion(_)
                | Error::ChunkExhausted
                | Error::CaptureFormat(_)
                | Error::MixBuffer { .. }
                | Error::MixChannels(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Voice engine failure: ")?;
        match self {
            Error::Opus(e) => write!(f, "opus codec error {}.", e),
            Error::ChannelMismatch { expected, found } => write!(
                f,
                "frame has {} channel(s), decoder expects {}.",
                found, expected
            ),
            Error::IllegalVoicePacket => write!(f, "malformed voice packet."),
            Error::UnsupportedVersion(v) => write!(f, "unsupported voice packet version {}.", v),
            Error::ChunkExhausted => write!(f, "read past the end of an audio chunk."),
            Error::CaptureFormat(len) => {
                write!(f, "capture delivered {} bytes, not whole samples.", len)
            },
            Error::MixBuffer { needed, available } => write!(
                f,
                "mix buffer holds {} samples, {} required.",
                available, needed
            ),
            Error::MixChannels(c) => write!(f, "cannot mix into {} channels.", c),
            Error::Device(e) => write!(f, "capture device error: {}.", e),
            Error::Settings(e) => write!(f, "invalid settings document {}.", e),
            Error::LocalSpeakerBound(id) => {
                write!(f, "local speaker already bound to id {}.", id)
            },
            Error::Uninitialised => write!(f, "engine is not initialised."),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Opus(e) => Some(e),
            Error::Device(e) => Some(e),
            Error::Settings(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OpusError> for Error {
    fn from(e: OpusError) -> Error {
        Error::Opus(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Error {
        Error::Device(e)
    }
}

impl From<JsonError> for Error {
    fn from(e: JsonError) -> Error {
        Error::Settings(e)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
/// Failures reported by an [`AudioBackend`] when opening capture.
///
/// [`AudioBackend`]: crate::backend::AudioBackend
pub enum DeviceError {
    /// No capture device matched the requested name.
    NotFound(String),
    /// No capture device is present at all.
    NoDefault,
    /// The device exists but refused to open.
    Open(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound(name) => write!(f, "no capture device named {:?}", name),
            DeviceError::NoDefault => write!(f, "no default capture device"),
            DeviceError::Open(reason) => write!(f, "failed to open device: {}", reason),
        }
    }
}

impl StdError for DeviceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_frame_errors_are_recoverable() {
        assert!(Error::IllegalVoicePacket.is_recoverable());
        assert!(Error::ChannelMismatch {
            expected: 1,
            found: 2
        }
        .is_recoverable());
        assert!(!Error::IllegalVoicePacket.is_fatal());
    }

    #[test]
    fn codec_construction_is_fatal() {
        let e: Error = OpusError::Opus(audiopus::ErrorCode::AllocFail).into();
        assert!(e.is_fatal());
        assert!(!e.is_recoverable());
    }

    #[test]
    fn device_errors_are_neither() {
        let e: Error = DeviceError::NoDefault.into();
        assert!(!e.is_fatal());
        assert!(!e.is_recoverable());
    }
}
