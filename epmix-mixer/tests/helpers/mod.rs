//! Test helpers for epmix-mixer integration tests
//!
//! Deterministic 16-bit PCM generators and WAV encoders with known
//! characteristics, so mixer output can be checked sample by sample.

#![allow(dead_code)]

use epmix_mixer::audio::wav;
use epmix_mixer::{AudioTrack, PcmBuffer};
use std::f64::consts::PI;

/// Constant-valued mono or interleaved PCM
pub fn constant_pcm(value: i16, duration_ms: u64, sample_rate: u32, channels: u16) -> PcmBuffer {
    let frames = (sample_rate as u64 * duration_ms / 1000) as usize;
    PcmBuffer::from_i16_samples(&vec![value; frames * channels as usize], sample_rate, channels)
}

/// Sine wave at `amplitude` (0.0 - 1.0 of full scale), same value on every channel
pub fn sine_pcm(
    frequency_hz: f64,
    amplitude: f64,
    duration_ms: u64,
    sample_rate: u32,
    channels: u16,
) -> PcmBuffer {
    let frames = (sample_rate as u64 * duration_ms / 1000) as usize;
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for n in 0..frames {
        let t = n as f64 / sample_rate as f64;
        let value = ((2.0 * PI * frequency_hz * t).sin() * amplitude * i16::MAX as f64).round() as i16;
        for _ in 0..channels {
            samples.push(value);
        }
    }
    PcmBuffer::from_i16_samples(&samples, sample_rate, channels)
}

/// Ramp `0, 1, 2, ...` (wrapping) for checking sample order
pub fn ramp_pcm(sample_count: usize, sample_rate: u32) -> PcmBuffer {
    let samples: Vec<i16> = (0..sample_count).map(|i| (i % 30_000) as i16).collect();
    PcmBuffer::from_i16_samples(&samples, sample_rate, 1)
}

/// Inline WAV track from PCM
pub fn wav_track(pcm: &PcmBuffer) -> AudioTrack {
    AudioTrack::from_bytes(wav::encode(pcm))
}

/// Write a WAV with hound, for checking the decoder against another encoder
pub fn hound_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
