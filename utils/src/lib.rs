//! Synthetic PCM sources shared by tests and benches.

use byteorder::{LittleEndian, WriteBytesExt};
use std::f32::consts::PI;

/// Sample rate assumed by all generators.
pub const SAMPLE_RATE: usize = 48_000;

/// Frequency of generated test tones.
pub const TONE_HZ: f32 = 440.0;

/// Creates `len` frames of a full-scale sine tone.
///
/// Stereo output duplicates each sample into both channels.
pub fn make_sine(len: usize, stereo: bool) -> Vec<i16> {
    make_sine_at(len, stereo, 1.0)
}

/// Creates `len` frames of a sine tone with peak `amplitude` in `[0, 1]`.
pub fn make_sine_at(len: usize, stereo: bool, amplitude: f32) -> Vec<i16> {
    let chans = if stereo { 2 } else { 1 };
    let mut out = Vec::with_capacity(len * chans);

    for i in 0..len {
        let x = (2.0 * PI * TONE_HZ * i as f32 / SAMPLE_RATE as f32).sin();
        let sample = (x * amplitude * f32::from(i16::MAX)) as i16;
        for _ in 0..chans {
            out.push(sample);
        }
    }

    out
}

/// Creates `len` frames of digital silence.
pub fn make_silence(len: usize, stereo: bool) -> Vec<i16> {
    vec![0; len * if stereo { 2 } else { 1 }]
}

/// Serialises samples as the little-endian byte stream an audio driver delivers.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.write_i16::<LittleEndian>(*s)
            .expect("Vec<u8> writes are infallible.");
    }
    out
}

/// Root-mean-square amplitude of a block, normalised to `[0, 1]`.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples.iter().map(|s| f64::from(*s).powi(2)).sum();
    ((sum / samples.len() as f64).sqrt() / f64::from(i16::MAX)) as f32
}
