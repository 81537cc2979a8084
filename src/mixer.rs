//! Mixing kernels run inside the audio output callback.
//!
//! Speakers are accumulated into an `i32` scratch buffer so several loud
//! voices can overlap without wrapping; the result is scaled by the output
//! volume and clamped into the destination.

/// Positional attenuation hook.
///
/// Called with a channel index (0 = left, 1 = right), the speaker's world
/// position and a range scale (always `1.0` here). Returns how much that
/// channel should be attenuated, from `0.0` (full volume) to `1.0` (silent).
pub type PositionalAttenuation<'a> = &'a dyn Fn(u32, crate::Position, f32) -> f32;

/// Gains below this are treated as inaudible.
pub const AUDIBLE_GAIN: f32 = 1.0e-4;

/// Converts attenuation amounts into per-channel gains.
#[inline]
pub fn gains_from_attenuation(left: f32, right: f32) -> [f32; 2] {
    [
        (1.0 - left).clamp(0.0, 1.0),
        (1.0 - right).clamp(0.0, 1.0),
    ]
}

/// Whether any channel of `gains` can be heard at `volume`.
#[inline]
pub fn is_audible(gains: [f32; 2], volume: f32) -> bool {
    gains.iter().any(|g| g * volume > AUDIBLE_GAIN)
}

/// Accumulates interleaved stereo `source` into `acc`, which has
/// `dest_channels` interleaved channels.
///
/// Mono destinations receive the average of both source channels. Extra
/// destination channels beyond two reuse the right channel. Returns the
/// number of destination frames touched.
#[inline]
pub fn mix_stereo_into(
    source: &[i16],
    acc: &mut [i32],
    dest_channels: usize,
    gains: [f32; 2],
    volume: f32,
) -> usize {
    let frames = (source.len() / 2).min(acc.len() / dest_channels.max(1));
    let left = gains[0] * volume;
    let right = gains[1] * volume;

    if dest_channels == 1 {
        for (d, s) in acc.iter_mut().zip(source.chunks_exact(2)).take(frames) {
            let v = 0.5 * (f32::from(s[0]) * left + f32::from(s[1]) * right);
            *d = d.saturating_add(v as i32);
        }
    } else {
        for (d_frame, s) in acc
            .chunks_exact_mut(dest_channels)
            .zip(source.chunks_exact(2))
            .take(frames)
        {
            for (ch, d) in d_frame.iter_mut().enumerate() {
                let v = if ch == 0 {
                    f32::from(s[0]) * left
                } else {
                    f32::from(s[1]) * right
                };
                *d = d.saturating_add(v as i32);
            }
        }
    }

    frames
}

/// Adds the accumulated mix into `dest`, scaled by `output_volume`,
/// clamping to the `i16` range.
#[inline]
pub fn finish_into(acc: &[i32], dest: &mut [i16], output_volume: f32) {
    for (d, a) in dest.iter_mut().zip(acc) {
        let mixed = i32::from(*d).saturating_add((*a as f32 * output_volume) as i32);
        *d = mixed.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_destination_averages() {
        let mut acc = [0; 2];
        let n = mix_stereo_into(&[100, 300, -100, -300], &mut acc, 1, [1.0, 1.0], 1.0);
        assert_eq!(n, 2);
        assert_eq!(acc, [200, -200]);
    }

    #[test]
    fn stereo_destination_applies_channel_gains() {
        let mut acc = [0; 4];
        mix_stereo_into(&[1000, 1000, 1000, 1000], &mut acc, 2, [1.0, 0.25], 0.5);
        assert_eq!(acc, [500, 125, 500, 125]);
    }

    #[test]
    fn short_source_only_fills_prefix() {
        let mut acc = [0; 6];
        assert_eq!(mix_stereo_into(&[10, 20], &mut acc, 2, [1.0, 1.0], 1.0), 1);
        assert_eq!(acc, [10, 20, 0, 0, 0, 0]);
    }

    #[test]
    fn surround_reuses_right() {
        let mut acc = [0; 4];
        mix_stereo_into(&[1, 2], &mut acc, 4, [1.0, 1.0], 1.0);
        assert_eq!(acc, [1, 2, 2, 2]);
    }

    #[test]
    fn finish_accumulates_and_clamps() {
        let mut dest = [100, 30_000, -30_000];
        finish_into(&[50, 10_000, -10_000], &mut dest, 1.0);
        assert_eq!(dest, [150, i16::MAX, i16::MIN]);
    }

    #[test]
    fn huge_gains_saturate() {
        let loud = [i16::MAX, i16::MIN, i16::MAX, i16::MIN];
        let mut acc = [0; 4];
        for _ in 0..3 {
            mix_stereo_into(&loud, &mut acc, 2, [1.0, 1.0], 1.0e9);
        }
        assert_eq!(acc, [i32::MAX, i32::MIN, i32::MAX, i32::MIN]);

        let mut dest = [i16::MAX, i16::MIN, 0, 0];
        finish_into(&acc, &mut dest, 1.0e9);
        assert_eq!(dest, [i16::MAX, i16::MIN, i16::MAX, i16::MIN]);
    }

    #[test]
    fn attenuation_maps_to_gain() {
        assert_eq!(gains_from_attenuation(0.0, 1.0), [1.0, 0.0]);
        assert_eq!(gains_from_attenuation(-1.0, 2.0), [1.0, 0.0]);
        assert!(!is_audible([0.0, 0.0], 1.0));
        assert!(is_audible([0.0, 0.5], 1.0));
        assert!(!is_audible([1.0, 1.0], 0.0));
    }
}
