//! # Episode Mixer Common Library
//!
//! Shared code for the episode mixer crates:
//! - Error and result types
//! - Configuration file and cache directory resolution
//! - Explicit voice sample cache (memory + disk)

pub mod config;
pub mod error;
pub mod sample_cache;

pub use error::{Error, Result};
pub use sample_cache::SampleCache;
