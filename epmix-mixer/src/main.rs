//! Episode Mixer (epmix-mixer) - command-line entry point
//!
//! Reads a JSON mix request, resolves remote tracks, writes the mixed WAV,
//! and prints a JSON summary (mime type, duration, track count, size) on
//! stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use epmix_common::config::{resolve_cache_dir, resolve_config_file, CACHE_DIR_ENV_VAR, CONFIG_ENV_VAR};
use epmix_common::SampleCache;
use epmix_mixer::config::ToolConfig;
use epmix_mixer::pipeline::{CachedFetcher, HttpFetcher};
use epmix_mixer::{MixPipeline, MixRequest};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for epmix-mixer
#[derive(Parser, Debug)]
#[command(name = "epmix-mixer")]
#[command(about = "Mix voice segments and background music into one episode track")]
#[command(version)]
struct Args {
    /// JSON mix request
    #[arg(short, long)]
    request: PathBuf,

    /// Where to write the mixed WAV
    #[arg(short, long)]
    output: PathBuf,

    /// TOML config file (falls back to EPMIX_CONFIG, then the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sample cache folder for fetched tracks
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Fetch remote tracks without the sample cache
    #[arg(long)]
    no_cache: bool,

    /// Force preview padding regardless of the request
    #[arg(long)]
    preview: bool,

    /// Log level (overrides the config file; RUST_LOG overrides both)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load bootstrap config before logging so its level applies
    let tool_config = match resolve_config_file(args.config.as_deref(), CONFIG_ENV_VAR) {
        Some(path) => ToolConfig::load(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => ToolConfig::default(),
    };

    // Initialize tracing
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| tool_config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("epmix_mixer={level},epmix_common={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let body = std::fs::read_to_string(&args.request)
        .with_context(|| format!("Failed to read request {}", args.request.display()))?;
    let mut request = MixRequest::from_json(&body).context("Invalid mix request")?;
    if args.preview {
        request = request.with_preview(true);
    }

    let result = if args.no_cache {
        let pipeline = MixPipeline::http(&tool_config.fetch)
            .context("Failed to build HTTP client")?
            .with_default_overrides(tool_config.mix.clone());
        pipeline.run(request).await
    } else {
        let cache_dir = resolve_cache_dir(
            args.cache_dir.as_deref(),
            CACHE_DIR_ENV_VAR,
            tool_config.cache_dir.as_deref(),
        );
        info!("Sample cache: {}", cache_dir.display());
        let cache = SampleCache::init(&cache_dir)
            .with_context(|| format!("Failed to open sample cache {}", cache_dir.display()))?;
        let http = HttpFetcher::new(&tool_config.fetch).context("Failed to build HTTP client")?;

        let pipeline = MixPipeline::new(CachedFetcher::new(http, Arc::new(cache)))
            .with_default_overrides(tool_config.mix.clone());
        pipeline.run(request).await
    }
    .context("Mix failed")?;

    std::fs::write(&args.output, result.data())
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(
        "Wrote {} ({} ms, {} tracks)",
        args.output.display(),
        result.duration_ms(),
        result.track_count()
    );

    println!("{}", serde_json::to_string_pretty(&result.summary())?);
    Ok(())
}
