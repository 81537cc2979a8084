#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
//! Warble is a real-time voice chat engine for games, written in Rust.
//!
//! The library offers:
//!  * Microphone capture with push-to-talk or voice activity detection,
//!  Opus encoding, and a budgeted packetizer for the host's network layer.
//!  * A speaker registry which decodes each remote participant's audio
//!  into its own anti-jitter playback stream.
//!  * A lock-light mixer for the host's audio output callback, with
//!  per-speaker volume, muting and positional stereo attenuation.
//!
//! Warble does not own any threads or sockets. The host wires three
//! contexts into a shared [`Voice`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use warble::{Config, NullBackend, Voice, VoiceSettings};
//!
//! let voice = Arc::new(Voice::new(
//!     Arc::new(NullBackend),
//!     Config::default(),
//!     VoiceSettings::default(),
//! ));
//! voice.init().expect("Opus should be available.");
//!
//! // Capture callback: voice.read_audio_data(bytes)
//! // Output callback: voice.mix(buffer, frames, channels)
//!
//! // Game update loop:
//! voice.set_input(true);
//! let report = voice.update(None);
//! let mut packet = vec![];
//! if voice.send(&mut packet, 1024) > 0 {
//!     // ...send `packet` to peers.
//! }
//! # let _ = report;
//! ```
//!
//! ## Codec support
//! Opus support is provided by [audiopus] (an FFI wrapper for libopus).
//!
//! [audiopus]: https://github.com/lakelezz/audiopus

#![warn(clippy::pedantic)]
#![allow(
    // Allowed as they are too pedantic
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::too_many_lines,
    clippy::cast_lossless,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
)]

pub mod backend;
pub mod capture;
pub mod codec;
mod config;
pub mod constants;
pub mod error;
pub mod id;
#[cfg(feature = "internals")]
pub mod mixer;
#[cfg(not(feature = "internals"))]
pub(crate) mod mixer;
pub mod packet;
pub mod settings;
pub mod speaker;
mod voice;

pub use crate::{
    backend::{AudioBackend, CaptureFormat, NullBackend},
    config::Config,
    error::{DeviceError, Error, Result},
    id::{EntityId, SpeakerId},
    mixer::PositionalAttenuation,
    settings::{ChannelMode, InputMode, VoiceSettings},
    speaker::{Position, Speaker, SpeakerHandle, SpeakerState},
    voice::{TickReport, Voice},
};
