//! Sample-rate converter built on `rubato`, shaped to the
//! libsamplerate-style external contract of §6: `new(quality, channels)` /
//! `process(ratio, input, end_of_input) -> (in_used, output)` / `reset`.
//!
//! Wraps `SincFixedIn`, whose ratio can be adjusted between calls —
//! needed because `src_ratio` here changes whenever `pitch_shift` changes
//! (§3.1). Quality maps to `SincInterpolationParameters` (window /
//! oversampling factor) tiers.

use rubato::{Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::error::{Error, Result};
use crate::player::state::SrcQuality;

const CHUNK_SIZE: usize = 1024;
/// How far the ratio may drift from the one passed to `new` before a
/// fresh resampler would be needed; `SincFixedIn` supports ratio changes
/// up to this relative bound without reallocating its filter bank.
const MAX_RELATIVE_RATIO: f64 = 4.0;

fn params_for(quality: SrcQuality) -> SincInterpolationParameters {
    match quality {
        SrcQuality::Fastest => SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.90,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::Hann,
        },
        SrcQuality::Medium => SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.93,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::Blackman,
        },
        SrcQuality::Best => SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 512,
            window: WindowFunction::BlackmanHarris2,
        },
    }
}

/// Ratio-adjustable sample-rate converter over interleaved f32 audio.
pub struct Resampler {
    inner: SincFixedIn<f32>,
    channels: usize,
    last_ratio: f64,
    carry: Vec<Vec<f32>>,
}

impl Resampler {
    pub fn new(quality: SrcQuality, channels: u16) -> Result<Self> {
        let channels = channels as usize;
        let inner = SincFixedIn::<f32>::new(1.0, MAX_RELATIVE_RATIO, params_for(quality), CHUNK_SIZE, channels)
            .map_err(|e| Error::Resample(e.to_string()))?;
        Ok(Self {
            inner,
            channels,
            last_ratio: 1.0,
            carry: vec![Vec::new(); channels],
        })
    }

    /// Process one block of interleaved input at the given `ratio`
    /// (output_rate / effective_input_rate). Returns the number of input
    /// frames consumed (always all of `input`, since partial chunks are
    /// buffered internally) and the interleaved output samples produced
    /// by any chunk that became ready.
    ///
    /// When `end_of_input` is set, any buffered remainder is flushed
    /// (zero-padded to a full chunk) rather than held for a call that
    /// will never come.
    pub fn process(&mut self, ratio: f64, input: &[f32], end_of_input: bool) -> Result<(usize, Vec<f32>)> {
        if (ratio - self.last_ratio).abs() > f64::EPSILON {
            self.inner
                .set_resample_ratio(ratio, true)
                .map_err(|e| Error::Resample(e.to_string()))?;
            self.last_ratio = ratio;
        }

        let in_used = input.len() / self.channels;
        for (i, sample) in input.iter().enumerate() {
            self.carry[i % self.channels].push(*sample);
        }

        let mut output = Vec::new();
        while self.carry[0].len() >= CHUNK_SIZE {
            let chunk: Vec<Vec<f32>> = self
                .carry
                .iter_mut()
                .map(|ch| ch.drain(..CHUNK_SIZE).collect())
                .collect();
            self.run_chunk(&chunk, &mut output)?;
        }

        if end_of_input && !self.carry[0].is_empty() {
            let remaining = self.carry[0].len();
            let pad = CHUNK_SIZE - remaining;
            let chunk: Vec<Vec<f32>> = self
                .carry
                .iter_mut()
                .map(|ch| {
                    ch.extend(std::iter::repeat_n(0.0, pad));
                    ch.drain(..CHUNK_SIZE).collect()
                })
                .collect();
            self.run_chunk(&chunk, &mut output)?;
        }

        Ok((in_used, output))
    }

    fn run_chunk(&mut self, chunk: &[Vec<f32>], output: &mut Vec<f32>) -> Result<()> {
        let resampled = self
            .inner
            .process(chunk, None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        if resampled.is_empty() || resampled[0].is_empty() {
            return Ok(());
        }
        let frames = resampled[0].len();
        for frame in 0..frames {
            for ch in &resampled {
                output.push(ch[frame]);
            }
        }
        Ok(())
    }

    /// Reset internal state (call on seek/loop).
    pub fn reset(&mut self) {
        for ch in &mut self.carry {
            ch.clear();
        }
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_ratio_round_trips_sample_count() {
        let mut r = Resampler::new(SrcQuality::Medium, 1).unwrap();
        let input = vec![0.0f32; 4096];
        let (used, out) = r.process(1.0, &input, true).unwrap();
        assert_eq!(used, 4096);
        assert!(!out.is_empty());
    }

    #[test]
    fn ratio_change_does_not_error() {
        let mut r = Resampler::new(SrcQuality::Fastest, 2).unwrap();
        let input = vec![0.0f32; 2048];
        assert!(r.process(1.0, &input, false).is_ok());
        assert!(r.process(2.0, &input, true).is_ok());
    }

    #[test]
    fn reset_clears_carry() {
        let mut r = Resampler::new(SrcQuality::Medium, 1).unwrap();
        r.process(1.0, &[0.0; 10], false).unwrap();
        assert!(!r.carry[0].is_empty());
        r.reset();
        assert!(r.carry[0].is_empty());
    }
}
