//! Stateless sample-rate conversion for interleaved int16 audio
//!
//! Each call maps one batch from the core's rate to the device rate. No
//! history is carried between calls, so consecutive batches are interpolated
//! independently and may show a tiny seam at batch edges.
//!
//! Source positions are computed with integer arithmetic
//! (`i * in_rate / out_rate`), which keeps the output length exact:
//! `ceil(in_frames * out_rate / in_rate)`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::convert::saturate_i16;

/// Interpolation used when the core rate differs from the device rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMode {
    /// Two-point linear interpolation (cheap)
    Linear,
    /// Four-point Catmull-Rom spline (tension 0.5)
    #[default]
    Cubic,
}

/// Number of output frames produced for `in_frames` input frames
///
/// Returns `in_frames` unchanged when either rate is zero or both match.
pub fn output_frames(in_frames: usize, in_rate: u32, out_rate: u32) -> usize {
    if in_rate == out_rate || in_rate == 0 || out_rate == 0 {
        return in_frames;
    }
    let scaled = in_frames as u64 * out_rate as u64;
    scaled.div_ceil(in_rate as u64) as usize
}

/// Resample interleaved stereo samples from `in_rate` to `out_rate`
pub fn resample(input: &[i16], in_rate: u32, out_rate: u32, mode: ResampleMode) -> Cow<'_, [i16]> {
    resample_interleaved(input, 2, in_rate, out_rate, mode)
}

/// Resample interleaved samples with an arbitrary channel count
///
/// Identical rates (or a zero rate, meaning "unknown") return the input
/// borrowed and untouched. A trailing partial frame is ignored.
pub fn resample_interleaved(
    input: &[i16],
    channels: usize,
    in_rate: u32,
    out_rate: u32,
    mode: ResampleMode,
) -> Cow<'_, [i16]> {
    if in_rate == out_rate || in_rate == 0 || out_rate == 0 {
        return Cow::Borrowed(input);
    }
    if channels == 0 {
        return Cow::Owned(Vec::new());
    }

    let in_frames = input.len() / channels;
    if in_frames == 0 {
        return Cow::Owned(Vec::new());
    }

    let out_frames = output_frames(in_frames, in_rate, out_rate);
    let last = in_frames - 1;
    let sample = |frame: usize, ch: usize| input[frame.min(last) * channels + ch] as f32;

    let (in_rate, out_rate) = (in_rate as u64, out_rate as u64);
    let mut out = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let pos = i as u64 * in_rate;
        let idx = ((pos / out_rate) as usize).min(last);
        let frac = (pos % out_rate) as f32 / out_rate as f32;

        match mode {
            ResampleMode::Linear => {
                for ch in 0..channels {
                    let a = sample(idx, ch);
                    let b = sample(idx + 1, ch);
                    out.push(saturate_i16(a + (b - a) * frac));
                }
            }
            ResampleMode::Cubic => {
                let prev = idx.saturating_sub(1);
                for ch in 0..channels {
                    let value = catmull_rom(
                        sample(prev, ch),
                        sample(idx, ch),
                        sample(idx + 1, ch),
                        sample(idx + 2, ch),
                        frac,
                    );
                    out.push(saturate_i16(value));
                }
            }
        }
    }

    Cow::Owned(out)
}

/// Catmull-Rom spline through `p1..p2`, evaluated at `t` in [0, 1)
#[inline]
fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;
    ((a * t + b) * t + c) * t + d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_ramp(frames: usize) -> Vec<i16> {
        (0..frames)
            .flat_map(|i| [(i * 10) as i16, -((i * 10) as i16)])
            .collect()
    }

    #[test]
    fn test_identity_rate_borrows_input() {
        let input = stereo_ramp(64);
        for mode in [ResampleMode::Linear, ResampleMode::Cubic] {
            let out = resample(&input, 44100, 44100, mode);
            assert!(matches!(out, Cow::Borrowed(_)));
            assert_eq!(&*out, &input[..]);
        }
    }

    #[test]
    fn test_unknown_rate_passes_through() {
        let input = stereo_ramp(8);
        assert_eq!(&*resample(&input, 0, 48000, ResampleMode::Cubic), &input[..]);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample(&[], 32000, 48000, ResampleMode::Cubic).is_empty());
        assert!(resample(&[7], 32000, 48000, ResampleMode::Linear).is_empty());
    }

    #[test]
    fn test_upsample_32k_to_48k_cubic() {
        let input = stereo_ramp(100);
        let out = resample(&input, 32000, 48000, ResampleMode::Cubic);
        assert_eq!(out.len() / 2, 150);

        // First frame lands exactly on the first input frame
        assert_eq!(out[0], input[0]);
        assert_eq!(out[1], input[1]);

        // Last frame within one LSB of the last input frame
        let last_in = (input[198], input[199]);
        let last_out = (out[out.len() - 2], out[out.len() - 1]);
        assert!((last_out.0 as i32 - last_in.0 as i32).abs() <= 1);
        assert!((last_out.1 as i32 - last_in.1 as i32).abs() <= 1);
    }

    #[test]
    fn test_edge_frames_within_one_lsb_for_smooth_signal() {
        let input: Vec<i16> = (0..100).flat_map(|_| [1234i16, -4321]).collect();
        let out = resample(&input, 32000, 48000, ResampleMode::Cubic);
        assert_eq!(out.len(), 300);
        assert_eq!(&out[..2], &[1234, -4321]);
        assert_eq!(&out[298..], &[1234, -4321]);
    }

    #[test]
    fn test_output_length_tracks_rate_ratio() {
        for (in_rate, out_rate) in [(32000, 48000), (48000, 44100), (44100, 48000), (32040, 48000)] {
            for in_frames in [1usize, 2, 17, 533, 800] {
                let input = stereo_ramp(in_frames);
                let out = resample(&input, in_rate, out_rate, ResampleMode::Linear);
                let out_frames = out.len() / 2;
                let expected = (in_frames as f64 * out_rate as f64 / in_rate as f64).ceil() as usize;
                assert!(out_frames.abs_diff(expected) <= 1);
                if out_rate > in_rate {
                    assert!(out_frames >= in_frames);
                } else {
                    assert!(out_frames <= in_frames);
                }
            }
        }
    }

    #[test]
    fn test_downsample_length() {
        let input = stereo_ramp(150);
        let out = resample(&input, 48000, 32000, ResampleMode::Cubic);
        assert_eq!(out.len() / 2, 100);
    }

    #[test]
    fn test_linear_interpolates_midpoints() {
        let input = [0i16, 0, 100, -100];
        let out = resample(&input, 22050, 44100, ResampleMode::Linear);
        assert_eq!(&*out, &[0, 0, 50, -50, 100, -100, 100, -100]);
    }

    #[test]
    fn test_cubic_passes_through_known_samples() {
        let input: Vec<i16> = [0i16, 900, -400, 2500, 1200, -3000]
            .iter()
            .flat_map(|&v| [v, v / 2])
            .collect();
        let out = resample(&input, 24000, 48000, ResampleMode::Cubic);
        assert_eq!(out.len(), input.len() * 2);
        for frame in 0..input.len() / 2 {
            assert_eq!(out[frame * 4], input[frame * 2]);
            assert_eq!(out[frame * 4 + 1], input[frame * 2 + 1]);
        }
    }

    #[test]
    fn test_cubic_overshoot_saturates() {
        // Full-scale step: Catmull-Rom overshoots past both rails around it
        let input: Vec<i16> = [i16::MIN, i16::MIN, i16::MAX, i16::MAX, i16::MAX]
            .iter()
            .flat_map(|&v| [v, v])
            .collect();
        let out = resample(&input, 11025, 44100, ResampleMode::Cubic);

        // Output frames sourced at or after the step must stay pinned at the
        // top rail; wrapping would flip them negative
        for frame in 8..out.len() / 2 {
            assert_eq!(out[frame * 2], i16::MAX, "frame {frame}");
        }
        // And frames before the step stay at the bottom rail
        for frame in 0..4 {
            assert_eq!(out[frame * 2], i16::MIN, "frame {frame}");
        }
    }

    #[test]
    fn test_mono_resampling() {
        let input = [0i16, 100, 200, 300];
        let out = resample_interleaved(&input, 1, 22050, 44100, ResampleMode::Linear);
        assert_eq!(&*out, &[0, 50, 100, 150, 200, 250, 300, 300]);
    }

    #[test]
    fn test_output_frames_helper() {
        assert_eq!(output_frames(100, 32000, 48000), 150);
        assert_eq!(output_frames(100, 48000, 48000), 100);
        assert_eq!(output_frames(1, 48000, 44100), 1);
        assert_eq!(output_frames(0, 32000, 48000), 0);
    }
}
