//! Audio buffers, WAV container codec, and PCM signal operations

pub mod signal;
pub mod types;
pub mod wav;

pub use types::{AudioTrack, PcmBuffer, PcmFormat, TrackSource};
