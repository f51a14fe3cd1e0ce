//! Sample conversion: int16 <-> normalized float, gain, downmix
//!
//! All functions are stateless. Float samples are normalized to [-1.0, 1.0);
//! conversions back to int16 saturate instead of wrapping.

/// Scale between int16 and normalized float
const I16_SCALE: f32 = 32768.0;

/// Convert a signed 16-bit sample to normalized float
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / I16_SCALE
}

/// Convert a normalized float sample to int16, rounding and saturating
///
/// Uses the same scale as [`i16_to_f32`], so `f32_to_i16(i16_to_f32(x)) == x`
/// for every int16 value.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * I16_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Round and saturate an interpolated value already in int16 units
#[inline]
pub fn saturate_i16(value: f32) -> i16 {
    value.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Apply a scalar gain to int16 samples in place
///
/// Unity gain is bypassed. Each sample goes through the float domain and
/// saturates on the way back, so gains above 1.0 clip rather than wrap.
pub fn apply_gain_i16(samples: &mut [i16], gain: f32) {
    if gain == 1.0 {
        return;
    }
    if gain <= 0.0 {
        samples.fill(0);
        return;
    }
    for sample in samples.iter_mut() {
        *sample = f32_to_i16(i16_to_f32(*sample) * gain);
    }
}

/// Apply a scalar gain to float samples in place, clamping to [-1.0, 1.0]
pub fn apply_gain_f32(samples: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    if gain <= 0.0 {
        samples.fill(0.0);
        return;
    }
    for sample in samples.iter_mut() {
        *sample = (*sample * gain).clamp(-1.0, 1.0);
    }
}

/// Convert a block of int16 samples to normalized float
pub fn i16_slice_to_f32(src: &[i16]) -> Vec<f32> {
    src.iter().copied().map(i16_to_f32).collect()
}

/// Downmix interleaved stereo to mono by averaging each L/R pair
///
/// A trailing unpaired sample is ignored.
pub fn downmix_stereo_to_mono(src: &[i16]) -> Vec<i16> {
    src.chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect()
}
