//! WAV (RIFF/WAVE) container codec
//!
//! Decoding scans the chunk list for `fmt ` and `data`; every other chunk is
//! skipped using its declared size plus the RIFF pad byte for odd sizes.
//! Encoding always writes the canonical 44-byte header (`fmt ` + `data`
//! only, PCM format tag 1).
//!
//! All reads are bounds-checked slice accesses; malformed input yields a
//! `ContainerError`, never a panic.

use crate::audio::types::{PcmBuffer, PcmFormat};
use thiserror::Error;
use tracing::{debug, warn};

/// MIME type of every buffer this codec produces
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Size of the canonical header written by [`encode`]
pub const HEADER_LEN: usize = 44;

const RIFF_PREAMBLE_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_TAG_PCM: u16 = 1;

/// Largest channel count accepted from a `fmt ` chunk (7.1 surround)
pub const MAX_CHANNELS: u16 = 8;

/// Highest sample rate accepted from a `fmt ` chunk
pub const MAX_SAMPLE_RATE_HZ: u32 = 384_000;

/// Deepest sample accepted from a `fmt ` chunk
pub const MAX_BITS_PER_SAMPLE: u16 = 32;

/// Largest payload the 32-bit RIFF size fields can describe
const MAX_DATA_LEN: usize = (u32::MAX - 36) as usize;

/// Reasons a buffer is not a usable WAV container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("buffer too short for RIFF preamble ({0} bytes)")]
    TooShort(usize),

    #[error("missing RIFF/WAVE signature")]
    NotRiffWave,

    #[error("fmt chunk truncated at offset {0}")]
    TruncatedFormat(usize),

    #[error("unsupported format: {channels} channels, {sample_rate} Hz, {bits_per_sample} bits")]
    InvalidFormat {
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
    },

    #[error("no data chunk found")]
    MissingData,
}

/// Parse a WAV buffer into its PCM payload and format.
pub fn parse(bytes: &[u8]) -> Result<PcmBuffer, ContainerError> {
    if bytes.len() < RIFF_PREAMBLE_LEN {
        return Err(ContainerError::TooShort(bytes.len()));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(ContainerError::NotRiffWave);
    }

    let mut format: Option<PcmFormat> = None;
    let mut offset = RIFF_PREAMBLE_LEN;

    while let Some(header) = offset
        .checked_add(CHUNK_HEADER_LEN)
        .and_then(|end| bytes.get(offset..end))
    {
        let chunk_id = &header[0..4];
        let chunk_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        match chunk_id {
            b"fmt " => {
                format = Some(read_format(bytes, offset)?);
            }
            b"data" => {
                let start = offset + CHUNK_HEADER_LEN;
                let available = bytes.len() - start;
                let declared = chunk_size as usize;
                if declared > available {
                    debug!(declared, available, "data chunk larger than buffer, clamping");
                }
                let end = start + declared.min(available);

                let format = format.unwrap_or_else(|| {
                    debug!("data chunk without fmt chunk, assuming default raw format");
                    PcmFormat::DEFAULT_RAW
                });
                return Ok(PcmBuffer::new(bytes[start..end].to_vec(), format));
            }
            _ => {
                debug!(
                    chunk = %String::from_utf8_lossy(chunk_id),
                    size = chunk_size,
                    "Skipping WAV chunk"
                );
            }
        }

        // Chunks are WORD aligned: odd sizes carry one pad byte
        let padded = chunk_size as usize + (chunk_size as usize & 1);
        offset = match offset.checked_add(CHUNK_HEADER_LEN + padded) {
            Some(next) => next,
            None => break,
        };
    }

    Err(ContainerError::MissingData)
}

/// Parse a WAV buffer, returning `None` when it is not a valid container.
pub fn decode(bytes: &[u8]) -> Option<PcmBuffer> {
    parse(bytes).ok()
}

/// Parse a WAV buffer, falling back to raw PCM in the default format.
///
/// Used for every track entering the mixer: bare synthesizer output carries
/// no header at all.
pub fn decode_or_raw(bytes: &[u8]) -> PcmBuffer {
    match parse(bytes) {
        Ok(pcm) => pcm,
        Err(reason) => {
            debug!(
                %reason,
                bytes = bytes.len(),
                "Not a WAV container, treating as raw PCM (24 kHz mono 16-bit)"
            );
            PcmBuffer::new(bytes.to_vec(), PcmFormat::DEFAULT_RAW)
        }
    }
}

/// Serialize PCM into a canonical 44-byte-header WAV buffer.
///
/// RIFF sizes are 32-bit: a payload beyond ~4 GiB is cut at the last whole
/// frame that fits (logged as a warning) so the header always matches.
pub fn encode(pcm: &PcmBuffer) -> Vec<u8> {
    let format = pcm.format();
    let block_align = format.block_align();
    let data_len = encodable_len(pcm.len(), block_align);
    if data_len < pcm.len() {
        warn!(
            bytes = pcm.len(),
            kept = data_len,
            "PCM payload exceeds the WAV size limit, truncating"
        );
    }
    let byte_rate = format.sample_rate_hz.saturating_mul(block_align as u32);

    let mut out = Vec::with_capacity(HEADER_LEN + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    out.extend_from_slice(&FORMAT_TAG_PCM.to_le_bytes());
    out.extend_from_slice(&format.channel_count.to_le_bytes());
    out.extend_from_slice(&format.sample_rate_hz.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&(block_align as u16).to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    out.extend_from_slice(&pcm.data()[..data_len]);
    out
}

/// Payload bytes that fit the RIFF size fields, rounded down to whole frames
fn encodable_len(len: usize, block_align: usize) -> usize {
    if len <= MAX_DATA_LEN {
        return len;
    }
    let block = block_align.max(1);
    MAX_DATA_LEN - MAX_DATA_LEN % block
}

fn read_format(bytes: &[u8], chunk_offset: usize) -> Result<PcmFormat, ContainerError> {
    // Fields end at chunk+24 (bits per sample is the u16 at chunk+22)
    let chunk = bytes
        .get(chunk_offset..chunk_offset + 24)
        .ok_or(ContainerError::TruncatedFormat(chunk_offset))?;

    let channels = u16::from_le_bytes([chunk[10], chunk[11]]);
    let sample_rate = u32::from_le_bytes([chunk[12], chunk[13], chunk[14], chunk[15]]);
    let bits_per_sample = u16::from_le_bytes([chunk[22], chunk[23]]);

    let playable = (1..=MAX_CHANNELS).contains(&channels)
        && (1..=MAX_SAMPLE_RATE_HZ).contains(&sample_rate)
        && (8..=MAX_BITS_PER_SAMPLE).contains(&bits_per_sample)
        && bits_per_sample % 8 == 0;
    if !playable {
        return Err(ContainerError::InvalidFormat {
            channels,
            sample_rate,
            bits_per_sample,
        });
    }

    Ok(PcmFormat::new(sample_rate, channels, bits_per_sample))
}
