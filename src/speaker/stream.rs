use std::collections::VecDeque;

/// Decoded, interleaved stereo audio waiting to be mixed for one speaker.
///
/// Playback is gated by an anti-jitter floor: nothing is yielded until at
/// least `minimum_play_samples` are buffered. Once armed, the stream plays
/// until it fully drains, then waits for the floor again.
#[derive(Debug)]
pub struct PlaybackStream {
    samples: VecDeque<i16>,
    minimum_play_samples: usize,
    max_samples: usize,
    playing: bool,
}

impl PlaybackStream {
    /// Creates an empty stream holding at most `max_samples` samples.
    pub fn new(minimum_play_samples: usize, max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(minimum_play_samples.max(1) * 2),
            minimum_play_samples,
            max_samples: max_samples.max(minimum_play_samples),
            playing: false,
        }
    }

    /// Appends decoded audio, dropping the oldest samples beyond capacity.
    ///
    /// Returns the number of samples dropped.
    pub fn push(&mut self, decoded: &[i16]) -> usize {
        self.samples.extend(decoded.iter().copied());

        let excess = self.samples.len().saturating_sub(self.max_samples);
        // Keep stereo pairs aligned.
        let excess = excess + (excess % 2);
        let excess = excess.min(self.samples.len());
        self.samples.drain(..excess);
        excess
    }

    /// Samples the mixer may take right now.
    pub fn available(&self) -> usize {
        if self.playing || self.samples.len() >= self.minimum_play_samples {
            self.samples.len()
        } else {
            0
        }
    }

    /// Moves up to `out.len()` samples into `out`.
    ///
    /// Returns the number of samples written; zero while below the
    /// anti-jitter floor.
    pub fn pull(&mut self, out: &mut [i16]) -> usize {
        if !self.playing {
            if self.samples.len() < self.minimum_play_samples || self.samples.is_empty() {
                return 0;
            }
            self.playing = true;
        }

        let n = out.len().min(self.samples.len());
        for (dst, src) in out.iter_mut().zip(self.samples.drain(..n)) {
            *dst = src;
        }

        if self.samples.is_empty() {
            self.playing = false;
        }

        n
    }

    /// Whether the floor has been crossed and playback is ongoing.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Total buffered samples, whether or not they are playable.
    pub fn buffered(&self) -> usize {
        self.samples.len()
    }

    /// Drops all buffered audio and re-arms the floor.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.playing = false;
    }
}
