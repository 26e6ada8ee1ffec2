//! Configuration management for the episode mixer
//!
//! Two layers:
//! 1. **`MixConfig`**: the immutable value the mixing core reads. Built from
//!    the built-in defaults with caller overrides applied field by field.
//! 2. **`ToolConfig`**: bootstrap settings for the command-line tool loaded
//!    from TOML (cache folder, logging, fetch policy, default mix overrides).
//!
//! # Override priority (highest first)
//!
//! 1. Preview mode (forces 100ms start/end silence)
//! 2. Request `config` overrides
//! 3. TOML `[mix]` table
//! 4. Built-in defaults (`MixConfig::default()`)

use crate::error::{MixError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Leading/trailing silence used in preview mode
pub const PREVIEW_SILENCE_MS: u32 = 100;

/// Mixing parameters for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct MixConfig {
    /// Silence before the first voice track
    pub silence_start_ms: u32,

    /// Silence after the last voice track
    pub silence_end_ms: u32,

    /// Gap between consecutive tracks from the same speaker
    pub same_speaker_gap_ms: u32,

    /// Gap when the speaker changes (or is unknown)
    pub different_speaker_gap_ms: u32,

    /// Gap before the first track of a new section (0 disables)
    pub section_gap_ms: u32,

    /// Multiplier applied to every voice track (0.0 - 1.0)
    pub voice_volume: f64,

    /// Multiplier applied to the background bed (0.0 - 1.0)
    pub bgm_volume: f64,

    /// Reserved for sound effects; not read by the core yet
    pub sfx_volume: f64,

    /// Background fade-in, measured from the start of the output
    pub bgm_fade_in_ms: u32,

    /// Background fade-out, measured back from the end of the output
    pub bgm_fade_out_ms: u32,

    /// Reserved for loudness normalization; not read by the core yet
    pub normalize: bool,

    /// Reserved for dynamic range compression; not read by the core yet
    pub compress: bool,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            silence_start_ms: 500,
            silence_end_ms: 1000,
            same_speaker_gap_ms: 300,
            different_speaker_gap_ms: 800,
            section_gap_ms: 1500,
            voice_volume: 1.0,
            bgm_volume: 0.15,
            sfx_volume: 0.8,
            bgm_fade_in_ms: 2000,
            bgm_fade_out_ms: 3000,
            normalize: true,
            compress: false,
        }
    }
}

impl MixConfig {
    /// Apply every field the overrides set, keeping the rest
    pub fn with_overrides(mut self, overrides: &MixConfigOverrides) -> Self {
        fn set<T: Copy>(field: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *field = v;
            }
        }

        set(&mut self.silence_start_ms, overrides.silence_start_ms);
        set(&mut self.silence_end_ms, overrides.silence_end_ms);
        set(&mut self.same_speaker_gap_ms, overrides.same_speaker_gap_ms);
        set(&mut self.different_speaker_gap_ms, overrides.different_speaker_gap_ms);
        set(&mut self.section_gap_ms, overrides.section_gap_ms);
        set(&mut self.voice_volume, overrides.voice_volume);
        set(&mut self.bgm_volume, overrides.bgm_volume);
        set(&mut self.sfx_volume, overrides.sfx_volume);
        set(&mut self.bgm_fade_in_ms, overrides.bgm_fade_in_ms);
        set(&mut self.bgm_fade_out_ms, overrides.bgm_fade_out_ms);
        set(&mut self.normalize, overrides.normalize);
        set(&mut self.compress, overrides.compress);
        self
    }

    /// Shortened padding for fast iteration; everything else unchanged
    pub fn preview(mut self) -> Self {
        self.silence_start_ms = PREVIEW_SILENCE_MS;
        self.silence_end_ms = PREVIEW_SILENCE_MS;
        self
    }
}

/// Partial `MixConfig` supplied by a caller (request body or TOML `[mix]`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MixConfigOverrides {
    pub silence_start_ms: Option<u32>,
    pub silence_end_ms: Option<u32>,
    pub same_speaker_gap_ms: Option<u32>,
    pub different_speaker_gap_ms: Option<u32>,
    pub section_gap_ms: Option<u32>,
    pub voice_volume: Option<f64>,
    pub bgm_volume: Option<f64>,
    pub sfx_volume: Option<f64>,
    pub bgm_fade_in_ms: Option<u32>,
    pub bgm_fade_out_ms: Option<u32>,
    pub normalize: Option<bool>,
    pub compress: Option<bool>,
}

impl MixConfigOverrides {
    /// Layer `higher` on top of `self`; fields set in `higher` win
    pub fn merged_with(self, higher: &MixConfigOverrides) -> Self {
        Self {
            silence_start_ms: higher.silence_start_ms.or(self.silence_start_ms),
            silence_end_ms: higher.silence_end_ms.or(self.silence_end_ms),
            same_speaker_gap_ms: higher.same_speaker_gap_ms.or(self.same_speaker_gap_ms),
            different_speaker_gap_ms: higher
                .different_speaker_gap_ms
                .or(self.different_speaker_gap_ms),
            section_gap_ms: higher.section_gap_ms.or(self.section_gap_ms),
            voice_volume: higher.voice_volume.or(self.voice_volume),
            bgm_volume: higher.bgm_volume.or(self.bgm_volume),
            sfx_volume: higher.sfx_volume.or(self.sfx_volume),
            bgm_fade_in_ms: higher.bgm_fade_in_ms.or(self.bgm_fade_in_ms),
            bgm_fade_out_ms: higher.bgm_fade_out_ms.or(self.bgm_fade_out_ms),
            normalize: higher.normalize.or(self.normalize),
            compress: higher.compress.or(self.compress),
        }
    }

    /// Reject volume multipliers outside 0.0 - 1.0
    pub fn validate(&self) -> Result<()> {
        let volumes = [
            ("voiceVolume", self.voice_volume),
            ("bgmVolume", self.bgm_volume),
            ("sfxVolume", self.sfx_volume),
        ];

        for (name, value) in volumes {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(MixError::InvalidRequest(format!(
                        "{} must be between 0 and 1, got {}",
                        name, v
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Bootstrap configuration for the command-line tool, loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Sample cache folder (optional; falls back to environment → OS default)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote track fetch policy (optional)
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Default mix overrides applied beneath request overrides
    #[serde(default)]
    pub mix: MixConfigOverrides,
}

impl ToolConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let config: ToolConfig = epmix_common::config::load_toml(path)?;
        config
            .mix
            .validate()
            .map_err(|e| MixError::Config(e.to_string()))?;
        if config.fetch.max_attempts == 0 {
            return Err(MixError::Config("fetch.max_attempts must be at least 1".to_string()));
        }
        Ok(config)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// HTTP fetch policy for remote tracks
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchSettings {
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per URL, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}
