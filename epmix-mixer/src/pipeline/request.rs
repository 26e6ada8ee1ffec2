//! Validated mix request
//!
//! The JSON body handed to the mixer is parsed and validated once, here.
//! Schema violations are rejected before any audio work starts; past this
//! point the pipeline only sees typed `AudioTrack`s and `MixConfigOverrides`.

use crate::audio::types::AudioTrack;
use crate::audio::wav::WAV_MIME_TYPE;
use crate::config::{MixConfig, MixConfigOverrides};
use crate::error::{MixError, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

/// Upper bound on voice tracks per request (bounds fetch concurrency)
pub const MAX_VOICE_TRACKS: usize = 500;

/// Requested output container
///
/// Advisory only: the mixer always produces WAV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
    Mp3,
}

/// Track as it appears on the wire
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TrackBody {
    audio_base64: Option<String>,
    audio_url: Option<String>,
    mime_type: Option<String>,
    speaker: Option<String>,
    #[serde(default)]
    is_section_start: bool,
    pause_after_ms: Option<u32>,
    volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RequestBody {
    #[serde(default)]
    voice_tracks: Vec<TrackBody>,
    bgm_track: Option<TrackBody>,
    #[serde(default)]
    config: MixConfigOverrides,
    #[serde(default)]
    preview: bool,
    #[serde(default)]
    output_format: OutputFormat,
}

/// A validated request to mix one episode
#[derive(Debug, Clone)]
pub struct MixRequest {
    voice_tracks: Vec<AudioTrack>,
    bgm_track: Option<AudioTrack>,
    config: MixConfigOverrides,
    preview: bool,
    output_format: OutputFormat,
}

impl MixRequest {
    /// Build a request from already-typed tracks
    pub fn new(voice_tracks: Vec<AudioTrack>) -> Result<Self> {
        check_track_count(voice_tracks.len())?;
        for track in &voice_tracks {
            check_volume("volume", track.volume())?;
        }

        Ok(Self {
            voice_tracks,
            bgm_track: None,
            config: MixConfigOverrides::default(),
            preview: false,
            output_format: OutputFormat::Wav,
        })
    }

    /// Parse and validate a JSON request body
    pub fn from_json(body: &str) -> Result<Self> {
        let body: RequestBody = serde_json::from_str(body)
            .map_err(|e| MixError::InvalidRequest(format!("malformed request body: {}", e)))?;

        check_track_count(body.voice_tracks.len())?;
        body.config.validate()?;

        let voice_tracks = body
            .voice_tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| into_track(track, TrackRole::Voice(index)))
            .collect::<Result<Vec<_>>>()?;

        let bgm_track = match body.bgm_track {
            Some(track) => Some(into_track(track, TrackRole::Background)?),
            None => None,
        };

        Ok(Self {
            voice_tracks,
            bgm_track,
            config: body.config,
            preview: body.preview,
            output_format: body.output_format,
        })
    }

    pub fn with_bgm(mut self, bgm_track: AudioTrack) -> Result<Self> {
        check_volume("bgm volume", bgm_track.volume())?;
        self.bgm_track = Some(bgm_track);
        Ok(self)
    }

    pub fn with_config(mut self, config: MixConfigOverrides) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn voice_tracks(&self) -> &[AudioTrack] {
        &self.voice_tracks
    }

    pub fn bgm_track(&self) -> Option<&AudioTrack> {
        self.bgm_track.as_ref()
    }

    pub fn overrides(&self) -> &MixConfigOverrides {
        &self.config
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Effective config: defaults, then `base` overrides, then the request's
    /// own overrides, then preview padding.
    pub fn mix_config(&self, base: &MixConfigOverrides) -> MixConfig {
        let overrides = base.clone().merged_with(&self.config);
        let config = MixConfig::default().with_overrides(&overrides);
        if self.preview {
            config.preview()
        } else {
            config
        }
    }

    pub(crate) fn into_tracks(self) -> (Vec<AudioTrack>, Option<AudioTrack>) {
        (self.voice_tracks, self.bgm_track)
    }
}

fn check_track_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(MixError::EmptyInput);
    }
    if count > MAX_VOICE_TRACKS {
        return Err(MixError::InvalidRequest(format!(
            "{} voice tracks exceeds the limit of {}",
            count, MAX_VOICE_TRACKS
        )));
    }
    Ok(())
}

fn check_volume(name: &str, volume: f64) -> Result<()> {
    if (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(MixError::InvalidRequest(format!(
            "{} must be between 0 and 1, got {}",
            name, volume
        )))
    }
}

/// Where a track sits in the request, for error reporting
#[derive(Debug, Clone, Copy)]
enum TrackRole {
    Voice(usize),
    Background,
}

impl TrackRole {
    fn missing_payload(self) -> MixError {
        match self {
            TrackRole::Voice(index) => MixError::MissingPayload { index },
            TrackRole::Background => MixError::MissingBgmPayload,
        }
    }
}

impl std::fmt::Display for TrackRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackRole::Voice(index) => write!(f, "voice track {}", index),
            TrackRole::Background => write!(f, "background track"),
        }
    }
}

fn into_track(body: TrackBody, role: TrackRole) -> Result<AudioTrack> {
    let track = match (body.audio_base64, body.audio_url) {
        (Some(_), Some(_)) => {
            return Err(MixError::InvalidRequest(format!(
                "{} sets both audioBase64 and audioUrl",
                role
            )))
        }
        (Some(encoded), None) => AudioTrack::from_bytes(decode_base64(&encoded, role)?),
        (None, Some(url)) if !url.trim().is_empty() => AudioTrack::from_url(url.trim()),
        _ => return Err(role.missing_payload()),
    };

    let mut track = track
        .with_mime_type(body.mime_type.unwrap_or_else(|| WAV_MIME_TYPE.to_string()))
        .section_start(body.is_section_start);

    if let Some(speaker) = body.speaker.filter(|s| !s.trim().is_empty()) {
        track = track.with_speaker(speaker);
    }
    if let Some(pause) = body.pause_after_ms {
        track = track.with_pause_after_ms(pause);
    }
    if let Some(volume) = body.volume {
        check_volume(&format!("{} volume", role), volume)?;
        track = track.with_volume(volume);
    }

    Ok(track)
}

/// Decode inline audio, accepting an optional `data:` URL prefix
fn decode_base64(encoded: &str, role: TrackRole) -> Result<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| MixError::InvalidRequest(format!("{} audioBase64: {}", role, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::TrackSource;

    fn b64(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_parse_full_request() {
        let body = format!(
            r#"{{
                "voiceTracks": [
                    {{ "audioBase64": "{}", "speaker": "A", "pauseAfterMs": 250 }},
                    {{ "audioUrl": "https://cdn.example.com/b.wav", "speaker": "B",
                       "isSectionStart": true, "volume": 0.5 }}
                ],
                "bgmTrack": {{ "audioUrl": "https://cdn.example.com/bed.wav", "volume": 0.8 }},
                "config": {{ "silenceStartMs": 200 }},
                "preview": false,
                "outputFormat": "mp3"
            }}"#,
            b64(&[1, 2, 3, 4])
        );

        let request = MixRequest::from_json(&body).unwrap();
        let tracks = request.voice_tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].source(), &TrackSource::Inline(vec![1, 2, 3, 4]));
        assert_eq!(tracks[0].pause_after_ms(), Some(250));
        assert_eq!(tracks[0].mime_type(), "audio/wav");
        assert_eq!(tracks[1].remote_url(), Some("https://cdn.example.com/b.wav"));
        assert!(tracks[1].is_section_start());
        assert_eq!(tracks[1].volume(), 0.5);

        assert_eq!(request.bgm_track().unwrap().volume(), 0.8);
        assert_eq!(request.output_format(), OutputFormat::Mp3);
        assert_eq!(request.overrides().silence_start_ms, Some(200));
    }

    #[test]
    fn test_empty_voice_tracks() {
        let err = MixRequest::from_json(r#"{"voiceTracks": []}"#).unwrap_err();
        assert!(matches!(err, MixError::EmptyInput));

        let err = MixRequest::from_json("{}").unwrap_err();
        assert!(matches!(err, MixError::EmptyInput));

        assert!(matches!(MixRequest::new(Vec::new()), Err(MixError::EmptyInput)));
    }

    #[test]
    fn test_missing_payload() {
        let err = MixRequest::from_json(r#"{"voiceTracks": [{"speaker": "A"}]}"#).unwrap_err();
        assert!(matches!(err, MixError::MissingPayload { index: 0 }));
    }

    #[test]
    fn test_bgm_without_payload_names_background() {
        let body = r#"{"voiceTracks": [{"audioUrl": "https://x"}], "bgmTrack": {"volume": 0.5}}"#;
        let err = MixRequest::from_json(body).unwrap_err();
        assert!(matches!(err, MixError::MissingBgmPayload));
        assert_eq!(err.to_string(), "Background track has no audio payload");

        let body = r#"{"voiceTracks": [{"audioUrl": "https://x"}], "bgmTrack": {"audioBase64": "%%"}}"#;
        match MixRequest::from_json(body) {
            Err(MixError::InvalidRequest(msg)) => assert!(msg.starts_with("background track")),
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_both_payloads_rejected() {
        let body = r#"{"voiceTracks": [{"audioBase64": "AAAA", "audioUrl": "https://x"}]}"#;
        assert!(matches!(
            MixRequest::from_json(body),
            Err(MixError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_schema_violations() {
        // Unknown field
        let body = r#"{"voiceTracks": [{"audioUrl": "https://x", "gain": 2}]}"#;
        assert!(matches!(MixRequest::from_json(body), Err(MixError::InvalidRequest(_))));

        // Negative gap
        let body = r#"{"voiceTracks": [{"audioUrl": "https://x"}], "config": {"sectionGapMs": -5}}"#;
        assert!(matches!(MixRequest::from_json(body), Err(MixError::InvalidRequest(_))));

        // Volume out of range
        let body = r#"{"voiceTracks": [{"audioUrl": "https://x", "volume": 1.5}]}"#;
        assert!(matches!(MixRequest::from_json(body), Err(MixError::InvalidRequest(_))));

        // Bad base64
        let body = r#"{"voiceTracks": [{"audioBase64": "not base64!"}]}"#;
        assert!(matches!(MixRequest::from_json(body), Err(MixError::InvalidRequest(_))));

        // Unknown output format
        let body = r#"{"voiceTracks": [{"audioUrl": "https://x"}], "outputFormat": "flac"}"#;
        assert!(matches!(MixRequest::from_json(body), Err(MixError::InvalidRequest(_))));
    }

    #[test]
    fn test_data_url_prefix() {
        let body = format!(
            r#"{{"voiceTracks": [{{"audioBase64": "data:audio/wav;base64,{}"}}]}}"#,
            b64(&[9, 8])
        );
        let request = MixRequest::from_json(&body).unwrap();
        assert_eq!(request.voice_tracks()[0].inline_bytes(), Some(&[9u8, 8][..]));
    }

    #[test]
    fn test_blank_speaker_dropped() {
        let body = r#"{"voiceTracks": [{"audioUrl": "https://x", "speaker": "  "}]}"#;
        let request = MixRequest::from_json(body).unwrap();
        assert_eq!(request.voice_tracks()[0].speaker(), None);
    }

    #[test]
    fn test_too_many_tracks() {
        let tracks = vec![AudioTrack::from_url("https://x"); MAX_VOICE_TRACKS + 1];
        assert!(matches!(MixRequest::new(tracks), Err(MixError::InvalidRequest(_))));
    }

    #[test]
    fn test_mix_config_layering() {
        let base = MixConfigOverrides {
            silence_start_ms: Some(50),
            section_gap_ms: Some(2500),
            ..Default::default()
        };
        let request = MixRequest::new(vec![AudioTrack::from_url("https://x")])
            .unwrap()
            .with_config(MixConfigOverrides {
                silence_start_ms: Some(75),
                ..Default::default()
            })
            .unwrap();

        let config = request.mix_config(&base);
        assert_eq!(config.silence_start_ms, 75);
        assert_eq!(config.section_gap_ms, 2500);
        assert_eq!(config.silence_end_ms, 1000);

        let preview = request.with_preview(true).mix_config(&base);
        assert_eq!(preview.silence_start_ms, 100);
        assert_eq!(preview.silence_end_ms, 100);
        assert_eq!(preview.section_gap_ms, 2500);
    }
}
