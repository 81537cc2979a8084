//! Constants affecting capture, encoding, mixing and wire handling.

use audiopus::SampleRate;
use std::time::Duration;

/// Sample rate used for capture, encoding and playback.
pub const SAMPLE_RATE: SampleRate = SampleRate::Hz48000;

/// Sample rate used for capture, encoding and playback.
pub const SAMPLE_RATE_RAW: usize = 48_000;

/// Number of audio frames encoded per second.
pub const AUDIO_FRAME_RATE: usize = 50;

/// Length of time covered by a single encoded frame.
pub const TIMESTEP_LENGTH: Duration = Duration::from_millis(1000 / AUDIO_FRAME_RATE as u64);

/// Number of samples in one complete frame of audio per channel.
///
/// This is equally the number of stereo (joint) samples in an audio frame.
pub const MONO_FRAME_SIZE: usize = SAMPLE_RATE_RAW / AUDIO_FRAME_RATE;

/// Number of individual samples in one complete frame of stereo audio.
pub const STEREO_FRAME_SIZE: usize = 2 * MONO_FRAME_SIZE;

/// Largest decoded frame Opus may produce: 120ms of stereo audio.
pub const MAX_DECODED_FRAME_SIZE: usize = 6 * STEREO_FRAME_SIZE;

/// Largest packet Opus may emit for a single frame.
pub const MAX_OPUS_PACKET: usize = 1275;

/// Wire format version written at the start of every outbound packet.
pub const VOICE_VERSION: u16 = 1;

/// Size of the packet header (version).
pub const PACKET_HEADER_LEN: usize = 2;

/// Size of the length prefix preceding every encoded frame on the wire.
pub const FRAME_PREFIX_LEN: usize = 2;

/// Level reported for silent or idle sources, in decibels.
pub const SILENCE_DB: f32 = -96.0;

/// Default number of buffered samples required before playback begins.
pub const DEFAULT_MINIMUM_PLAY_SAMPLES: usize = 4096;

/// Default voice-activity hold-over after the level drops below threshold.
pub const DEFAULT_HOLD_OVER: Duration = Duration::from_millis(50);

/// Lifetime of one push-to-talk heartbeat.
pub const PUSH_TO_TALK_WINDOW: Duration = Duration::from_secs(1);

/// Default ceiling on encoded bytes awaiting transmission.
pub const DEFAULT_MAX_PENDING_BYTES: usize = 2048;

/// Delay between a settings change and the resulting save request.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(2);
