//! Error types for epmix-mixer
//!
//! Container parse failures are not listed here: they are recovered inside
//! the codec by the raw PCM fallback (see `audio::wav::decode_or_raw`).

use crate::pipeline::fetch::FetchError;
use thiserror::Error;

/// Main error type for the mixer
#[derive(Error, Debug)]
pub enum MixError {
    /// No voice tracks were supplied
    #[error("No voice tracks supplied")]
    EmptyInput,

    /// A track has neither inline bytes nor a resolvable remote reference
    #[error("Voice track {index} has no audio payload")]
    MissingPayload { index: usize },

    /// The background track was supplied without any audio payload
    #[error("Background track has no audio payload")]
    MissingBgmPayload,

    /// Request failed boundary validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Remote track resolution failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking mix task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),

    /// Errors from shared infrastructure (cache, config files)
    #[error(transparent)]
    Common(#[from] epmix_common::Error),
}

/// Convenience Result type using MixError
pub type Result<T> = std::result::Result<T, MixError>;
