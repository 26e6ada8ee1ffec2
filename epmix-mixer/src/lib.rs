//! # Episode Mixer Library (epmix-mixer)
//!
//! Assembles a finished episode track from synthesized speech segments and an
//! optional looping background-music bed.
//!
//! **Architecture:** data flows strictly downward:
//! `pipeline` (request validation, remote fetch) → `mixing` (concatenation,
//! gaps, BGM overlay) → `audio` (WAV codec, 16-bit PCM signal operations).
//!
//! Everything below `pipeline` is synchronous and performs no I/O.

pub mod audio;
pub mod config;
pub mod error;
pub mod mixing;
pub mod pipeline;

pub use audio::types::{AudioTrack, PcmBuffer, PcmFormat, TrackSource};
pub use config::{MixConfig, MixConfigOverrides};
pub use error::{MixError, Result};
pub use mixing::{mix, MixResult, MixedTrack};
pub use pipeline::{MixPipeline, MixRequest};
