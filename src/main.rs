use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod config;
mod media;
mod net;
mod providers;
mod resolver;

use resolver::types::AudioAsset;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Post URL, or any text containing one
    input: String,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<String>,

    /// Directory the resolved assets are written to
    #[arg(short, long, default_value = "out")]
    output: String,

    /// Re-encode the resolved video for circular playback (square,
    /// 640x640, 60s cap)
    #[arg(long)]
    video_note: bool,
}

fn get_config_path(args: &Args) -> Option<String> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("CONFIG_FILE") {
        return Some(path);
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = format!("{}/mediagrab/config.toml", xdg_config_home);
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = format!("{}/.config/mediagrab/config.toml", home.display());
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    None
}

async fn deliver(
    resolver: &resolver::Resolver,
    result: &resolver::types::ResolutionResult,
    args: &Args,
) -> Result<()> {
    let out_dir = std::path::Path::new(&args.output);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", args.output))?;

    for (idx, photo) in result.photos.iter().enumerate() {
        let path = out_dir.join(format!("photo_{}.jpg", idx + 1));
        resolver
            .fetcher()
            .download(&photo.url, &path)
            .await
            .with_context(|| format!("failed to download photo {}", photo.url))?;
    }

    match &result.audio {
        Some(AudioAsset::Url(candidate)) => {
            let path = out_dir.join("audio.m4a");
            resolver
                .fetcher()
                .download(&candidate.url, &path)
                .await
                .with_context(|| format!("failed to download audio {}", candidate.url))?;
        }
        Some(AudioAsset::File(file)) => {
            std::fs::copy(file, out_dir.join("audio.m4a")).context("failed to copy audio")?;
        }
        None => {}
    }

    if let Some(video) = &result.video {
        if args.video_note {
            media::ffmpeg::process_video_note(video, &out_dir.join("video_note.mp4")).await?;
        } else {
            std::fs::copy(video, out_dir.join("video.mp4")).context("failed to copy video")?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = get_config_path(&args) {
        config::Config::from_file(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path))?
    } else {
        config::Config::default()
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    if config.logging_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("Starting mediagrab...");

    let url = resolver::classify::extract_url(&args.input)
        .context("no URL found in the given input")?;

    let resolver = resolver::Resolver::new(config)?;

    // Request-scoped work directory: deleted on both success and failure.
    let workdir = tempfile::tempdir().context("failed to create work directory")?;

    let result = resolver
        .resolve(&url, workdir.path())
        .await
        .with_context(|| format!("failed to resolve {url}"))?;

    deliver(&resolver, &result, &args).await?;

    info!(
        photos = result.photos.len(),
        audio = result.audio.is_some(),
        video = result.video.is_some(),
        trail = %result
            .trail
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
        output = %args.output,
        "Done"
    );
    Ok(())
}
