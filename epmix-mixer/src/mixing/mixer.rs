//! Episode mixer
//!
//! Turns an ordered list of voice segments into one continuous track and
//! optionally lays a looping background bed underneath it.
//!
//! # Format handling
//!
//! The first voice track fixes the reference format (sample rate, channels,
//! bit depth) for every silence buffer generated in the call. Later tracks
//! are appended as-is: a track in a different format is logged as a warning
//! but not converted, so it plays back at the wrong speed/pitch. There is no
//! resampling anywhere in the mixer.

use crate::audio::signal;
use crate::audio::types::{AudioTrack, PcmBuffer, PcmFormat};
use crate::audio::wav;
use crate::config::MixConfig;
use crate::error::{MixError, Result};
use crate::mixing::gaps::gap_ms;
use serde::Serialize;
use tracing::{debug, info, warn};

/// A mixed (not yet encoded) track with its duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedTrack {
    pcm: PcmBuffer,
    duration_ms: u64,
}

impl MixedTrack {
    fn from_pcm(pcm: PcmBuffer) -> Self {
        let duration_ms = pcm.duration_ms();
        Self { pcm, duration_ms }
    }

    pub fn pcm(&self) -> &PcmBuffer {
        &self.pcm
    }

    pub fn into_pcm(self) -> PcmBuffer {
        self.pcm
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Wrap the PCM in a WAV container
    pub fn encode(&self) -> Vec<u8> {
        wav::encode(&self.pcm)
    }
}

/// Final output of one mix invocation
///
/// Only the mixer constructs this; the duration is always derived from the
/// mixed PCM.
#[derive(Debug, Clone)]
pub struct MixResult {
    data: Vec<u8>,
    duration_ms: u64,
    track_count: usize,
}

impl MixResult {
    /// Encoded WAV bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Always `audio/wav`
    pub fn mime_type(&self) -> &'static str {
        wav::WAV_MIME_TYPE
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Number of voice tracks mixed
    pub fn track_count(&self) -> usize {
        self.track_count
    }

    /// Metadata handed back to the caller alongside the bytes
    pub fn summary(&self) -> MixSummary {
        MixSummary {
            mime_type: self.mime_type(),
            duration_ms: self.duration_ms,
            track_count: self.track_count,
            bytes: self.data.len(),
        }
    }
}

/// Serializable summary of a `MixResult`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixSummary {
    pub mime_type: &'static str,
    pub duration_ms: u64,
    pub track_count: usize,
    pub bytes: usize,
}

/// Join voice tracks into one track with silence padding and gaps.
///
/// Layout: start silence, track 0, gap, track 1, ..., track N-1, end silence.
/// Each track is scaled by `track.volume * config.voice_volume`.
///
/// # Errors
/// - `EmptyInput` when `tracks` is empty
/// - `MissingPayload` when a track has no inline bytes (remote references
///   must be resolved by the caller first)
pub fn concatenate_with_gaps(tracks: &[AudioTrack], config: &MixConfig) -> Result<MixedTrack> {
    let first = tracks.first().ok_or(MixError::EmptyInput)?;

    let first_pcm = wav::decode_or_raw(payload(first, 0)?);
    let reference = first_pcm.format();
    debug!(
        sample_rate = reference.sample_rate_hz,
        channels = reference.channel_count,
        bits = reference.bits_per_sample,
        "Reference format from first voice track"
    );

    let mut out = Vec::new();
    if config.silence_start_ms > 0 {
        out.extend(signal::silence(config.silence_start_ms, reference));
    }

    let mut pending_first = Some(first_pcm);
    for (index, track) in tracks.iter().enumerate() {
        if index > 0 {
            let gap = gap_ms(&tracks[index - 1], track, config);
            if gap > 0 {
                out.extend(signal::silence(gap, reference));
            }
            debug!(index, gap_ms = gap, "Inserted gap");
        }

        let pcm = match pending_first.take() {
            Some(pcm) => pcm,
            None => wav::decode_or_raw(payload(track, index)?),
        };
        if pcm.format() != reference {
            warn_format_mismatch(index, reference, pcm.format());
        }

        let pcm = signal::apply_volume(pcm, track.volume() * config.voice_volume);
        debug!(index, bytes = pcm.len(), speaker = ?track.speaker(), "Appended voice track");
        out.extend_from_slice(pcm.data());
    }

    if config.silence_end_ms > 0 {
        out.extend(signal::silence(config.silence_end_ms, reference));
    }

    let mixed = MixedTrack::from_pcm(PcmBuffer::new(out, reference));
    debug!(
        tracks = tracks.len(),
        bytes = mixed.pcm.len(),
        duration_ms = mixed.duration_ms,
        "Voice tracks concatenated"
    );
    Ok(mixed)
}

/// Lay a looping background bed under a voice track.
///
/// The output keeps the voice length exactly. The bed restarts from its
/// beginning whenever it runs out, and its fade envelope spans the whole
/// output rather than the bed's own length.
///
/// A bed without a usable payload, or 16-bit violations on either side,
/// leave the voice untouched.
pub fn mix_with_bgm(voice: MixedTrack, bgm: &AudioTrack, config: &MixConfig) -> MixedTrack {
    let bgm_bytes = match bgm.inline_bytes() {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => {
            warn!("Background track has no payload, returning voice only");
            return voice;
        }
    };

    let bed = wav::decode_or_raw(bgm_bytes);
    let MixedTrack { pcm, duration_ms } = voice;
    let format = pcm.format();

    if bed.is_empty() || !format.is_16_bit() || !bed.format().is_16_bit() {
        debug!(
            voice_bits = format.bits_per_sample,
            bgm_bits = bed.format().bits_per_sample,
            bgm_bytes = bed.len(),
            "Background overlay skipped"
        );
        return MixedTrack { pcm, duration_ms };
    }
    if bed.format() != format {
        warn!(
            voice_rate = format.sample_rate_hz,
            voice_channels = format.channel_count,
            bgm_rate = bed.format().sample_rate_hz,
            bgm_channels = bed.format().channel_count,
            "Background format differs from voice; mixing without conversion"
        );
    }

    let total = pcm.sample_count();
    let fade_in = signal::samples_for_ms(config.bgm_fade_in_ms, format.sample_rate_hz);
    let fade_out = signal::samples_for_ms(config.bgm_fade_out_ms, format.sample_rate_hz);
    let gain = bgm.volume() * config.bgm_volume;

    let bed_data = bed.data();
    let mut data = pcm.into_data();
    for (index, out) in data.chunks_exact_mut(2).enumerate() {
        let bed_offset = (index * 2) % bed_data.len();
        let background = i16::from_le_bytes([bed_data[bed_offset], bed_data[bed_offset + 1]]);
        let fade = signal::fade_multiplier(index, total, fade_in, fade_out);

        let voice_sample = i16::from_le_bytes([out[0], out[1]]) as f64;
        let overlay = (background as f64 * gain * fade).round();
        out.copy_from_slice(&signal::clamp_sample(voice_sample + overlay).to_le_bytes());
    }

    debug!(
        bgm_bytes = bed_data.len(),
        loops = data.len() as f64 / bed_data.len() as f64,
        gain,
        "Background bed mixed"
    );

    MixedTrack {
        pcm: PcmBuffer::new(data, format),
        duration_ms,
    }
}

/// Mix voice tracks (and an optional background bed) into a WAV buffer.
///
/// Every track must already carry inline bytes; this function performs no
/// I/O. A background track that is still a remote reference is skipped.
pub fn mix(
    voice_tracks: &[AudioTrack],
    bgm: Option<&AudioTrack>,
    config: &MixConfig,
) -> Result<MixResult> {
    let voice = concatenate_with_gaps(voice_tracks, config)?;

    let mixed = match bgm {
        Some(bgm) => mix_with_bgm(voice, bgm, config),
        None => voice,
    };

    let result = MixResult {
        data: mixed.encode(),
        duration_ms: mixed.duration_ms(),
        track_count: voice_tracks.len(),
    };

    info!(
        tracks = result.track_count,
        with_bgm = bgm.is_some(),
        duration_ms = result.duration_ms,
        bytes = result.data.len(),
        "Mix complete"
    );
    Ok(result)
}

fn payload(track: &AudioTrack, index: usize) -> Result<&[u8]> {
    match track.inline_bytes() {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(MixError::MissingPayload { index }),
    }
}

fn warn_format_mismatch(index: usize, reference: PcmFormat, actual: PcmFormat) {
    warn!(
        index,
        expected_rate = reference.sample_rate_hz,
        expected_channels = reference.channel_count,
        expected_bits = reference.bits_per_sample,
        actual_rate = actual.sample_rate_hz,
        actual_channels = actual.channel_count,
        actual_bits = actual.bits_per_sample,
        "Voice track format differs from first track; appending without conversion"
    );
}
