use crate::constants::SILENCE_DB;

/// Estimates the loudness of a block of samples in dBFS.
///
/// Full-scale square waves read as 0dB; silence and empty input read as
/// [`SILENCE_DB`].
pub fn decibels(samples: &[i16]) -> f32 {
    decibels_scaled(samples, 1.0)
}

/// As [`decibels`], after applying `volume` to every sample.
pub fn decibels_scaled(samples: &[i16], volume: f32) -> f32 {
    decibels_of_blocks(std::iter::once(samples), volume)
}

/// Loudness across several blocks, treated as one contiguous signal.
pub fn decibels_of_blocks<'a>(blocks: impl IntoIterator<Item = &'a [i16]>, volume: f32) -> f32 {
    let mut sum = 0.0f64;
    let mut count = 0usize;

    for block in blocks {
        count += block.len();
        sum += block
            .iter()
            .map(|s| {
                let v = f64::from(*s) / f64::from(i16::MAX);
                v * v
            })
            .sum::<f64>();
    }

    if count == 0 {
        return SILENCE_DB;
    }

    let rms = (sum / count as f64).sqrt() * f64::from(volume.max(0.0));

    if rms <= 0.0 {
        SILENCE_DB
    } else {
        ((20.0 * rms.log10()) as f32).max(SILENCE_DB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_the_floor() {
        assert_eq!(decibels(&[]), SILENCE_DB);
        assert_eq!(decibels(&[0; 960]), SILENCE_DB);
    }

    #[test]
    fn full_scale_is_zero() {
        let square: Vec<i16> = (0..960)
            .map(|i| if i % 2 == 0 { i16::MAX } else { -i16::MAX })
            .collect();
        assert!(decibels(&square).abs() < 0.01);
    }

    #[test]
    fn blocks_match_contiguous() {
        let tone = utils::make_sine(4800, false);
        let (a, b) = tone.split_at(1000);
        let joined = decibels(&tone);
        let split = decibels_of_blocks(vec![a, b], 1.0);
        assert!((joined - split).abs() < 1e-4);
    }

    #[test]
    fn halving_volume_drops_six_db() {
        let tone = utils::make_sine(4800, false);
        let full = decibels(&tone);
        let half = decibels_scaled(&tone, 0.5);
        assert!((full - half - 6.02).abs() < 0.05);
        assert!((full + 3.01).abs() < 0.1);
    }
}
