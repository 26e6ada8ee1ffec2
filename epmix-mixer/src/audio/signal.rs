//! Stateless PCM signal operations
//!
//! Silence generation, volume scaling, linear fade envelopes, and additive
//! mixing over little-endian sample streams.
//!
//! # Precondition
//!
//! Volume, fade, and mixing are defined for **16-bit** samples only. Buffers
//! of any other depth are returned unmodified (logged at debug level) rather
//! than being misinterpreted.
//!
//! Sample results are rounded to the nearest integer and hard-clamped to
//! `[-32768, 32767]`; there is no limiter or compressor.

use crate::audio::types::{PcmBuffer, PcmFormat};
use tracing::debug;

/// Zero-filled PCM covering `duration_ms` (frame count rounded down)
pub fn silence(duration_ms: u32, format: PcmFormat) -> Vec<u8> {
    vec![0u8; format.frames_for_ms(duration_ms) * format.block_align()]
}

/// Round and hard-clamp a computed sample value
pub fn clamp_sample(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Linear fade envelope multiplier for interleaved sample `index` of `total`.
///
/// - `index < fade_in`: ramps `index / fade_in` (0.0 at the first sample)
/// - `index >= total - fade_out`: ramps `(total - index) / fade_out`
///
/// Both ramps multiply when they overlap on a short signal.
pub fn fade_multiplier(index: usize, total: usize, fade_in: usize, fade_out: usize) -> f64 {
    let mut multiplier = 1.0;

    if index < fade_in {
        multiplier *= index as f64 / fade_in as f64;
    }

    if fade_out > 0 && index + fade_out >= total {
        multiplier *= total.saturating_sub(index) as f64 / fade_out as f64;
    }

    multiplier
}

/// Scale every sample by `gain`. Identity when `gain == 1`.
pub fn apply_volume(pcm: PcmBuffer, gain: f64) -> PcmBuffer {
    if gain == 1.0 {
        return pcm;
    }

    let format = pcm.format();
    if !format.is_16_bit() {
        debug!(bits = format.bits_per_sample, "Volume skipped: not 16-bit PCM");
        return pcm;
    }

    let mut data = pcm.into_data();
    for bytes in data.chunks_exact_mut(2) {
        let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        let scaled = clamp_sample(sample as f64 * gain);
        bytes.copy_from_slice(&scaled.to_le_bytes());
    }

    PcmBuffer::new(data, format)
}

/// Apply linear fade-in / fade-out envelopes.
///
/// Fade lengths are `floor(ms / 1000 * sample_rate_hz)` samples, counted over
/// the interleaved stream (channels are not distinguished).
pub fn apply_fade(pcm: PcmBuffer, fade_in_ms: u32, fade_out_ms: u32, sample_rate_hz: u32) -> PcmBuffer {
    let format = pcm.format();
    if !format.is_16_bit() {
        debug!(bits = format.bits_per_sample, "Fade skipped: not 16-bit PCM");
        return pcm;
    }

    let fade_in = samples_for_ms(fade_in_ms, sample_rate_hz);
    let fade_out = samples_for_ms(fade_out_ms, sample_rate_hz);
    if fade_in == 0 && fade_out == 0 {
        return pcm;
    }

    let total = pcm.sample_count();
    let mut data = pcm.into_data();
    for (index, bytes) in data.chunks_exact_mut(2).enumerate() {
        let multiplier = fade_multiplier(index, total, fade_in, fade_out);
        if multiplier == 1.0 {
            continue;
        }

        let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        let faded = clamp_sample(sample as f64 * multiplier);
        bytes.copy_from_slice(&faded.to_le_bytes());
    }

    PcmBuffer::new(data, format)
}

/// Overlay `b` onto `a`: `clamp(a[i] + round(b[i] * gain_b))`.
///
/// The result has `a`'s length and format; samples past the end of `b` count
/// as silence.
pub fn mix_additive(a: PcmBuffer, b: &PcmBuffer, gain_b: f64) -> PcmBuffer {
    let format = a.format();
    if !format.is_16_bit() || !b.format().is_16_bit() {
        debug!(
            a_bits = format.bits_per_sample,
            b_bits = b.format().bits_per_sample,
            "Mix skipped: not 16-bit PCM"
        );
        return a;
    }

    let mut data = a.into_data();
    for (out, other) in data.chunks_exact_mut(2).zip(b.data().chunks_exact(2)) {
        let base = i16::from_le_bytes([out[0], out[1]]) as f64;
        let overlay = (i16::from_le_bytes([other[0], other[1]]) as f64 * gain_b).round();
        out.copy_from_slice(&clamp_sample(base + overlay).to_le_bytes());
    }

    PcmBuffer::new(data, format)
}

/// Envelope length in interleaved samples: `floor(ms / 1000 * rate)`
pub fn samples_for_ms(duration_ms: u32, sample_rate_hz: u32) -> usize {
    (duration_ms as f64 / 1000.0 * sample_rate_hz as f64).floor() as usize
}
