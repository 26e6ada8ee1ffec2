//! Mix pipeline
//!
//! Orchestrates one request end to end:
//! 1. Resolve remote voice and background tracks concurrently
//! 2. Derive the effective `MixConfig` (defaults, tool overrides, request
//!    overrides, preview)
//! 3. Hand fully-resolved tracks to the synchronous mixing core
//!
//! A voice track that cannot be fetched fails the request with
//! `MissingPayload`. A background bed that cannot be fetched is dropped and
//! the episode is produced voice-only.
//!
//! Mixing itself is CPU-bound and runs on tokio's blocking pool, so `run`
//! must be awaited inside a tokio runtime.

pub mod fetch;
pub mod request;

pub use fetch::{CachedFetcher, FetchError, HttpFetcher, TrackFetcher};
pub use request::{MixRequest, OutputFormat, MAX_VOICE_TRACKS};

use crate::audio::types::AudioTrack;
use crate::config::{FetchSettings, MixConfigOverrides};
use crate::error::{MixError, Result};
use crate::mixing::{self, MixResult};
use futures::future::join_all;
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Request runner bound to one track fetcher
pub struct MixPipeline<F> {
    fetcher: F,
    defaults: MixConfigOverrides,
}

impl MixPipeline<HttpFetcher> {
    /// Pipeline fetching remote tracks over HTTP
    pub fn http(settings: &FetchSettings) -> Result<Self> {
        Ok(Self::new(HttpFetcher::new(settings)?))
    }
}

impl<F: TrackFetcher> MixPipeline<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            defaults: MixConfigOverrides::default(),
        }
    }

    /// Overrides applied beneath every request's own `config`
    pub fn with_default_overrides(mut self, defaults: MixConfigOverrides) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve, mix, and encode one request
    pub async fn run(&self, request: MixRequest) -> Result<MixResult> {
        let span = info_span!("mix", request_id = %Uuid::new_v4());
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: MixRequest) -> Result<MixResult> {
        let config = request.mix_config(&self.defaults);
        if request.output_format() != OutputFormat::Wav {
            warn!(
                requested = ?request.output_format(),
                "Only WAV output is produced; ignoring requested format"
            );
        }
        info!(
            voice_tracks = request.voice_tracks().len(),
            with_bgm = request.bgm_track().is_some(),
            preview = request.is_preview(),
            "Mix request accepted"
        );

        let (voice_tracks, bgm_track) = request.into_tracks();
        let (voice, bgm) = futures::join!(
            self.resolve_voice(voice_tracks),
            self.resolve_bgm(bgm_track)
        );
        let voice = voice?;

        // Per-sample work runs on the blocking pool, inside the request span
        let span = Span::current();
        tokio::task::spawn_blocking(move || {
            span.in_scope(|| mixing::mix(&voice, bgm.as_ref(), &config))
        })
        .await
        .map_err(|e| MixError::Internal(format!("Mix task join error: {}", e)))?
    }

    async fn resolve_voice(&self, tracks: Vec<AudioTrack>) -> Result<Vec<AudioTrack>> {
        let resolved = join_all(
            tracks
                .into_iter()
                .enumerate()
                .map(|(index, track)| self.resolve(track, index)),
        )
        .await;

        resolved.into_iter().collect()
    }

    async fn resolve(&self, track: AudioTrack, index: usize) -> Result<AudioTrack> {
        let Some(url) = track.remote_url().map(str::to_owned) else {
            return Ok(track);
        };

        match self.fetcher.fetch(&url).await {
            Ok(bytes) => Ok(track.resolved(bytes)),
            Err(e) => {
                warn!(index, url = %url, error = %e, "Voice track fetch failed");
                Err(MixError::MissingPayload { index })
            }
        }
    }

    async fn resolve_bgm(&self, track: Option<AudioTrack>) -> Option<AudioTrack> {
        let track = track?;
        let Some(url) = track.remote_url().map(str::to_owned) else {
            return Some(track);
        };

        match self.fetcher.fetch(&url).await {
            Ok(bytes) => Some(track.resolved(bytes)),
            Err(e) => {
                warn!(url = %url, error = %e, "Background track fetch failed, mixing voice only");
                None
            }
        }
    }
}
