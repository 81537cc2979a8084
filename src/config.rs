use crate::constants::*;
use std::time::Duration;

/// Tuning for a [`Voice`] engine.
///
/// Unlike [`VoiceSettings`], these values are chosen by the host
/// application and are never persisted.
///
/// [`Voice`]: crate::Voice
/// [`VoiceSettings`]: crate::VoiceSettings
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Config {
    /// Number of buffered samples a speaker needs before playback starts.
    ///
    /// This smooths over irregular network delivery at the cost of startup
    /// latency. Once playback starts, it continues until the stream drains.
    ///
    /// Defaults to 4096 samples.
    pub minimum_play_samples: usize,

    /// Maximum number of decoded samples held per speaker.
    ///
    /// The oldest samples are dropped beyond this, bounding latency if a
    /// speaker is not being mixed.
    ///
    /// Defaults to one second of stereo audio.
    pub max_buffered_samples: usize,

    /// Time transmission stays enabled after the level falls below
    /// threshold in voice activity mode.
    ///
    /// Defaults to 50ms.
    pub hold_over: Duration,

    /// Lifetime of a single push-to-talk heartbeat.
    ///
    /// Defaults to 1 second.
    pub push_to_talk_window: Duration,

    /// Time without decoded audio before an active speaker goes idle.
    ///
    /// Defaults to 1 second.
    pub speaker_idle_timeout: Duration,

    /// Encoded bytes which may await [`Voice::send`] before capture stops
    /// feeding the encoder.
    ///
    /// Defaults to 2048 bytes.
    ///
    /// [`Voice::send`]: crate::Voice::send
    pub max_pending_bytes: usize,

    /// Maximum captured samples held between update ticks.
    ///
    /// Defaults to one second of stereo audio.
    pub max_capture_samples: usize,

    /// Delay between a settings change and the save request it triggers.
    ///
    /// Defaults to 2 seconds.
    pub save_delay: Duration,

    /// Number of audio callback errors retained until the next update.
    ///
    /// Defaults to 32.
    pub callback_error_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            minimum_play_samples: DEFAULT_MINIMUM_PLAY_SAMPLES,
            max_buffered_samples: 2 * SAMPLE_RATE_RAW,
            hold_over: DEFAULT_HOLD_OVER,
            push_to_talk_window: PUSH_TO_TALK_WINDOW,
            speaker_idle_timeout: Duration::from_secs(1),
            max_pending_bytes: DEFAULT_MAX_PENDING_BYTES,
            max_capture_samples: 2 * SAMPLE_RATE_RAW,
            save_delay: DEFAULT_SAVE_DELAY,
            callback_error_capacity: 32,
        }
    }
}

impl Config {
    /// Sets this `Config`'s playback start threshold, in samples.
    #[must_use]
    pub fn minimum_play_samples(mut self, minimum_play_samples: usize) -> Self {
        self.minimum_play_samples = minimum_play_samples;
        self
    }

    /// Sets this `Config`'s per-speaker buffer ceiling, in samples.
    #[must_use]
    pub fn max_buffered_samples(mut self, max_buffered_samples: usize) -> Self {
        self.max_buffered_samples = max_buffered_samples;
        self
    }

    /// Sets this `Config`'s voice activity hold-over.
    #[must_use]
    pub fn hold_over(mut self, hold_over: Duration) -> Self {
        self.hold_over = hold_over;
        self
    }

    /// Sets this `Config`'s push-to-talk heartbeat lifetime.
    #[must_use]
    pub fn push_to_talk_window(mut self, push_to_talk_window: Duration) -> Self {
        self.push_to_talk_window = push_to_talk_window;
        self
    }

    /// Sets this `Config`'s speaker idle timer.
    #[must_use]
    pub fn speaker_idle_timeout(mut self, speaker_idle_timeout: Duration) -> Self {
        self.speaker_idle_timeout = speaker_idle_timeout;
        self
    }

    /// Sets this `Config`'s ceiling on untransmitted encoded bytes.
    #[must_use]
    pub fn max_pending_bytes(mut self, max_pending_bytes: usize) -> Self {
        self.max_pending_bytes = max_pending_bytes;
        self
    }

    /// Sets this `Config`'s ceiling on captured samples between ticks.
    #[must_use]
    pub fn max_capture_samples(mut self, max_capture_samples: usize) -> Self {
        self.max_capture_samples = max_capture_samples;
        self
    }

    /// Sets this `Config`'s settings save delay.
    #[must_use]
    pub fn save_delay(mut self, save_delay: Duration) -> Self {
        self.save_delay = save_delay;
        self
    }

    /// Sets this `Config`'s callback error backlog.
    #[must_use]
    pub fn callback_error_capacity(mut self, callback_error_capacity: usize) -> Self {
        self.callback_error_capacity = callback_error_capacity;
        self
    }
}
