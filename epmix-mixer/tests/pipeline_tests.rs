//! Pipeline integration tests
//!
//! Drive `MixPipeline` from JSON request bodies with an in-memory fetcher,
//! covering remote resolution, fallbacks, preview mode, and the sample cache.

mod helpers;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use epmix_common::SampleCache;
use epmix_mixer::audio::wav;
use epmix_mixer::pipeline::{CachedFetcher, FetchError, TrackFetcher};
use epmix_mixer::{MixConfigOverrides, MixError, MixPipeline, MixRequest};
use helpers::constant_pcm;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves canned bytes by URL and counts every call
#[derive(Default)]
struct MemoryFetcher {
    tracks: HashMap<String, Vec<u8>>,
    calls: Arc<AtomicUsize>,
}

impl MemoryFetcher {
    fn serve(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.tracks.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl TrackFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tracks.get(url).cloned().ok_or_else(|| FetchError::Network {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

fn one_second_wav(value: i16) -> Vec<u8> {
    wav::encode(&constant_pcm(value, 1_000, 16_000, 1))
}

#[tokio::test]
async fn test_mixed_inline_and_remote_request() {
    let fetcher = MemoryFetcher::default()
        .serve("https://cdn.example.com/b.wav", one_second_wav(200))
        .serve("https://cdn.example.com/bed.wav", one_second_wav(1_000));
    let body = format!(
        r#"{{
            "voiceTracks": [
                {{ "audioBase64": "{}", "speaker": "A" }},
                {{ "audioUrl": "https://cdn.example.com/b.wav", "speaker": "B" }}
            ],
            "bgmTrack": {{ "audioUrl": "https://cdn.example.com/bed.wav" }}
        }}"#,
        general_purpose::STANDARD.encode(one_second_wav(100))
    );

    let pipeline = MixPipeline::new(fetcher);
    let result = pipeline.run(MixRequest::from_json(&body).unwrap()).await.unwrap();

    assert_eq!(result.duration_ms(), 4_300);
    assert_eq!(result.track_count(), 2);
    assert_eq!(pipeline.fetcher().calls.load(Ordering::SeqCst), 2);

    // Background is audible in the leading silence once the fade-in starts
    let samples = wav::decode(result.data()).unwrap().samples_i16().unwrap();
    assert_eq!(samples[0], 0);
    assert!(samples[7_999] > 0);
}

#[tokio::test]
async fn test_unreachable_voice_track_fails_request() {
    let body = r#"{
        "voiceTracks": [
            { "audioUrl": "https://cdn.example.com/a.wav" },
            { "audioUrl": "https://cdn.example.com/missing.wav" }
        ]
    }"#;
    let fetcher = MemoryFetcher::default().serve("https://cdn.example.com/a.wav", one_second_wav(1));

    let err = MixPipeline::new(fetcher)
        .run(MixRequest::from_json(body).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, MixError::MissingPayload { index: 1 }));
}

#[tokio::test]
async fn test_unreachable_bgm_is_not_fatal() {
    let body = format!(
        r#"{{
            "voiceTracks": [{{ "audioBase64": "{}" }}],
            "bgmTrack": {{ "audioUrl": "https://cdn.example.com/gone.wav" }},
            "config": {{ "silenceStartMs": 0, "silenceEndMs": 0 }}
        }}"#,
        general_purpose::STANDARD.encode(one_second_wav(42))
    );

    let result = MixPipeline::new(MemoryFetcher::default())
        .run(MixRequest::from_json(&body).unwrap())
        .await
        .unwrap();

    let samples = wav::decode(result.data()).unwrap().samples_i16().unwrap();
    assert!(samples.iter().all(|&s| s == 42));
    assert_eq!(result.duration_ms(), 1_000);
}

#[tokio::test]
async fn test_preview_request() {
    let body = format!(
        r#"{{
            "voiceTracks": [{{ "audioBase64": "{}" }}],
            "config": {{ "silenceStartMs": 2000 }},
            "preview": true
        }}"#,
        general_purpose::STANDARD.encode(one_second_wav(1))
    );

    let result = MixPipeline::new(MemoryFetcher::default())
        .run(MixRequest::from_json(&body).unwrap())
        .await
        .unwrap();
    // Preview padding wins over the request override
    assert_eq!(result.duration_ms(), 1_200);
}

#[tokio::test]
async fn test_tool_defaults_sit_beneath_request_config() {
    let body = format!(
        r#"{{
            "voiceTracks": [{{ "audioBase64": "{}" }}],
            "config": {{ "silenceEndMs": 0 }}
        }}"#,
        general_purpose::STANDARD.encode(one_second_wav(1))
    );
    let defaults = MixConfigOverrides {
        silence_start_ms: Some(250),
        silence_end_ms: Some(5_000),
        ..Default::default()
    };

    let result = MixPipeline::new(MemoryFetcher::default())
        .with_default_overrides(defaults)
        .run(MixRequest::from_json(&body).unwrap())
        .await
        .unwrap();
    assert_eq!(result.duration_ms(), 1_250);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sample_cache_spans_requests() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let body = r#"{"voiceTracks": [{ "audioUrl": "https://cdn.example.com/a.wav" }]}"#;

    for _ in 0..2 {
        let cache = Arc::new(SampleCache::init(dir.path()).unwrap());
        let fetcher = MemoryFetcher {
            tracks: HashMap::from([("https://cdn.example.com/a.wav".to_string(), one_second_wav(9))]),
            calls: Arc::clone(&calls),
        };

        let result = MixPipeline::new(CachedFetcher::new(fetcher, cache))
            .run(MixRequest::from_json(body).unwrap())
            .await
            .unwrap();
        assert_eq!(result.duration_ms(), 2_500);
    }

    // Second run was served from the disk tier of a fresh cache instance
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_request_rejected_before_mixing() {
    assert!(matches!(
        MixRequest::from_json(r#"{"voiceTracks": []}"#),
        Err(MixError::EmptyInput)
    ));
    assert!(matches!(
        MixRequest::from_json(r#"{"voiceTracks": [{}]}"#),
        Err(MixError::MissingPayload { index: 0 })
    ));
    assert!(matches!(
        MixRequest::from_json(r#"{"voiceTracks": [{"audioUrl": "x"}], "config": {"bgmVolume": 2}}"#),
        Err(MixError::InvalidRequest(_))
    ));
    assert!(matches!(
        MixRequest::from_json("not json"),
        Err(MixError::InvalidRequest(_))
    ));
}
