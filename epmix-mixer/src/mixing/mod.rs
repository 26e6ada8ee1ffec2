//! Episode assembly: gap scheduling, concatenation, and background overlay

pub mod gaps;
pub mod mixer;

pub use gaps::gap_ms;
pub use mixer::{concatenate_with_gaps, mix, mix_with_bgm, MixResult, MixedTrack};
