//! User-facing voice settings, as loaded from and saved to a config store.

use crate::error::Result;
use audiopus::Channels;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current version stamped into saved settings documents.
pub const SETTINGS_VERSION: u32 = 1;

/// Policy deciding when captured audio is transmitted.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum InputMode {
    /// Transmit whenever the captured level exceeds the activity threshold.
    VoiceActivity,
    /// Transmit while the host keeps renewing [`Voice::set_input`].
    ///
    /// [`Voice::set_input`]: crate::Voice::set_input
    #[default]
    PushToTalk,
}

/// Channel layout of encoded outbound audio.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ChannelMode {
    /// Single-channel encoding.
    #[default]
    Mono,
    /// Two-channel encoding.
    Stereo,
}

impl ChannelMode {
    pub(crate) const fn to_opus(self) -> Channels {
        use ChannelMode::*;
        match self {
            Mono => Channels::Mono,
            Stereo => Channels::Stereo,
        }
    }

    /// Number of interleaved channels for this mode.
    pub const fn channels(self) -> usize {
        use ChannelMode::*;
        match self {
            Mono => 1,
            Stereo => 2,
        }
    }

    /// Number of interleaved samples making up one codec frame.
    pub const fn sample_count_in_frame(self) -> usize {
        use crate::constants::{MONO_FRAME_SIZE, STEREO_FRAME_SIZE};
        use ChannelMode::*;
        match self {
            Mono => MONO_FRAME_SIZE,
            Stereo => STEREO_FRAME_SIZE,
        }
    }

    pub(crate) const fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(ChannelMode::Mono),
            2 => Some(ChannelMode::Stereo),
            _ => None,
        }
    }
}

/// Persisted voice settings.
///
/// Serialised with camelCase keys. Missing fields take their defaults and
/// unknown fields are ignored, so documents written by older or newer
/// clients still load.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VoiceSettings {
    /// Format version of the document.
    pub version: u32,
    /// Master switch for voice chat.
    ///
    /// Defaults to `true`.
    pub enabled: bool,
    /// Whether the local microphone is captured at all.
    ///
    /// Defaults to `true`.
    pub input_enabled: bool,
    /// Transmission policy.
    ///
    /// Defaults to [`InputMode::PushToTalk`].
    pub input_mode: InputMode,
    /// Outbound channel layout.
    ///
    /// Defaults to [`ChannelMode::Mono`].
    pub channel_mode: ChannelMode,
    /// Gain applied to all mixed voices.
    pub output_volume: f32,
    /// Gain applied to captured audio before encoding.
    pub input_volume: f32,
    /// Voice activity threshold, in decibels.
    ///
    /// Defaults to -50dB.
    pub threshold: f32,
    /// Name of the capture device to open, or `None` for the system default.
    pub device_name: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            enabled: true,
            input_enabled: true,
            input_mode: InputMode::default(),
            channel_mode: ChannelMode::default(),
            output_volume: 1.0,
            input_volume: 1.0,
            threshold: -50.0,
            device_name: None,
        }
    }
}

impl VoiceSettings {
    /// Parses settings from a JSON document.
    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Serialises these settings into a JSON document.
    pub fn to_json(&self) -> Value {
        let mut out = self.clone();
        out.version = SETTINGS_VERSION;
        serde_json::to_value(out).unwrap_or(Value::Null)
    }

    /// Whether microphone capture should run under these settings.
    pub fn wants_capture(&self) -> bool {
        self.enabled && self.input_enabled
    }
}
