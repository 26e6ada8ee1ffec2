//! Core audio data types
//!
//! Defines the input clip (`AudioTrack`) and the decoded sample buffer
//! (`PcmBuffer`) that flow through the mixing pipeline.
//!
//! **Sample layout:** little-endian signed integers, channels interleaved
//! (`[L, R, L, R, ...]` for stereo). Every buffer holds whole frames only.

/// Sample format parameters of a PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    /// Samples per second per channel
    pub sample_rate_hz: u32,

    /// Interleaved channel count
    pub channel_count: u16,

    /// Bits per individual sample (16 is the only depth the DSP operates on)
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// Format assumed for buffers that carry no WAV container.
    ///
    /// Matches the fixed output of the upstream speech synthesizer:
    /// 24 kHz, mono, 16-bit.
    pub const DEFAULT_RAW: PcmFormat = PcmFormat::new(24_000, 1, 16);

    pub const fn new(sample_rate_hz: u32, channel_count: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate_hz,
            channel_count,
            bits_per_sample,
        }
    }

    /// Bytes occupied by one sample of one channel
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    /// Bytes occupied by one frame (one sample for every channel)
    pub fn block_align(&self) -> usize {
        self.bytes_per_sample() * self.channel_count as usize
    }

    /// True when the signal operations can process this format
    pub fn is_16_bit(&self) -> bool {
        self.bits_per_sample == 16
    }

    /// Frames covering `duration_ms`, rounded down
    pub fn frames_for_ms(&self, duration_ms: u32) -> usize {
        (duration_ms as f64 / 1000.0 * self.sample_rate_hz as f64).floor() as usize
    }

    /// Duration of `byte_len` bytes of audio, rounded to the nearest millisecond
    pub fn duration_ms(&self, byte_len: usize) -> u64 {
        let block_align = self.block_align();
        if block_align == 0 || self.sample_rate_hz == 0 {
            return 0;
        }

        let frames = byte_len as f64 / self.bytes_per_sample() as f64 / self.channel_count as f64;
        (frames / self.sample_rate_hz as f64 * 1000.0).round() as u64
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::DEFAULT_RAW
    }
}

/// Decoded PCM audio: raw sample bytes plus their format.
///
/// **Invariant:** `data.len()` is a whole multiple of the frame size
/// (`bits_per_sample / 8 * channel_count`). Construction drops any trailing
/// partial frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    data: Vec<u8>,
    format: PcmFormat,
}

impl PcmBuffer {
    /// Wrap raw sample bytes, truncating a trailing partial frame
    pub fn new(mut data: Vec<u8>, format: PcmFormat) -> Self {
        let block_align = format.block_align();
        if block_align > 0 {
            let remainder = data.len() % block_align;
            if remainder != 0 {
                tracing::debug!(
                    dropped_bytes = remainder,
                    "Truncating partial frame from PCM payload"
                );
                data.truncate(data.len() - remainder);
            }
        }

        Self { data, format }
    }

    /// Build a 16-bit buffer from sample values
    pub fn from_i16_samples(samples: &[i16], sample_rate_hz: u32, channel_count: u16) -> Self {
        let data = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::new(data, PcmFormat::new(sample_rate_hz, channel_count, 16))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Interleaved sample count (all channels)
    pub fn sample_count(&self) -> usize {
        match self.format.bytes_per_sample() {
            0 => 0,
            n => self.data.len() / n,
        }
    }

    /// Duration rounded to the nearest millisecond
    pub fn duration_ms(&self) -> u64 {
        self.format.duration_ms(self.data.len())
    }

    /// Decode the payload as 16-bit samples.
    ///
    /// Returns `None` for any other bit depth.
    pub fn samples_i16(&self) -> Option<Vec<i16>> {
        if !self.format.is_16_bit() {
            return None;
        }

        Some(
            self.data
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect(),
        )
    }
}

/// Where a track's encoded audio lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    /// Encoded container bytes held in memory
    Inline(Vec<u8>),

    /// URL the fetch collaborator must resolve before mixing
    Remote(String),
}

/// One input clip for the mixer.
///
/// Immutable once built: the `with_*` methods consume and return the track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    source: TrackSource,
    mime_type: String,
    speaker: Option<String>,
    is_section_start: bool,
    pause_after_ms: Option<u32>,
    volume: f64,
}

impl AudioTrack {
    /// Track backed by in-memory encoded bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::with_source(TrackSource::Inline(bytes))
    }

    /// Track that must be fetched from `url` before mixing
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::with_source(TrackSource::Remote(url.into()))
    }

    fn with_source(source: TrackSource) -> Self {
        Self {
            source,
            mime_type: crate::audio::wav::WAV_MIME_TYPE.to_string(),
            speaker: None,
            is_section_start: false,
            pause_after_ms: None,
            volume: 1.0,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Mark the track as the first segment of a new section
    pub fn section_start(mut self, is_section_start: bool) -> Self {
        self.is_section_start = is_section_start;
        self
    }

    /// Explicit pause after this track, overriding the computed gap
    pub fn with_pause_after_ms(mut self, pause_after_ms: u32) -> Self {
        self.pause_after_ms = Some(pause_after_ms);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Replace a remote reference with the fetched bytes
    pub fn resolved(mut self, bytes: Vec<u8>) -> Self {
        self.source = TrackSource::Inline(bytes);
        self
    }

    pub fn source(&self) -> &TrackSource {
        &self.source
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn speaker(&self) -> Option<&str> {
        self.speaker.as_deref()
    }

    pub fn is_section_start(&self) -> bool {
        self.is_section_start
    }

    pub fn pause_after_ms(&self) -> Option<u32> {
        self.pause_after_ms
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn inline_bytes(&self) -> Option<&[u8]> {
        match &self.source {
            TrackSource::Inline(bytes) => Some(bytes),
            TrackSource::Remote(_) => None,
        }
    }

    pub fn remote_url(&self) -> Option<&str> {
        match &self.source {
            TrackSource::Remote(url) => Some(url),
            TrackSource::Inline(_) => None,
        }
    }
}
