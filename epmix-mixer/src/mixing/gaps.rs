//! Pause scheduling between adjacent voice segments

use crate::audio::types::AudioTrack;
use crate::config::MixConfig;

/// Pause (ms) to insert between `previous` and `current`.
///
/// Priority, first match wins:
/// 1. `previous` carries an explicit pause override greater than zero
/// 2. `current` starts a section and the section gap is enabled
/// 3. both tracks name the same (non-empty) speaker
/// 4. anything else counts as a speaker change
///
/// A result of 0 inserts no silence.
pub fn gap_ms(previous: &AudioTrack, current: &AudioTrack, config: &MixConfig) -> u32 {
    if let Some(pause) = previous.pause_after_ms().filter(|&p| p > 0) {
        return pause;
    }

    if current.is_section_start() && config.section_gap_ms > 0 {
        return config.section_gap_ms;
    }

    match (previous.speaker(), current.speaker()) {
        (Some(a), Some(b)) if !a.is_empty() && a == b => config.same_speaker_gap_ms,
        _ => config.different_speaker_gap_ms,
    }
}
