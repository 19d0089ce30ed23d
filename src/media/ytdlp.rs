//! Generic media-platform acquisition through the yt-dlp binary: metadata
//! probing, full video downloads with playlist entry selection, and
//! audio-only pulls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use crate::net::BROWSER_USER_AGENT;

const INFO_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Prefer streams with an actual video track; merge into mp4.
const VIDEO_FORMAT: &str =
    "bestvideo[vcodec!=none]+bestaudio[acodec!=none]/best[vcodec!=none]/best";

async fn run_ytdlp(args: &[&str], timeout: Duration, what: &str) -> Result<Vec<u8>> {
    let output = tokio::time::timeout(timeout, Command::new("yt-dlp").args(args).output())
        .await
        .with_context(|| format!("{what} timed out"))?
        .with_context(|| format!("failed to run yt-dlp for {what}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{what} failed: {}", stderr.trim());
    }
    Ok(output.stdout)
}

/// Metadata-only probe. Returns the parsed info document without
/// downloading anything.
pub async fn extract_info(url: &str) -> Result<Value> {
    debug!(url, "probing with yt-dlp");
    let stdout = run_ytdlp(
        &["--dump-single-json", "--no-download", "--no-warnings", url],
        INFO_TIMEOUT,
        "metadata probe",
    )
    .await?;
    serde_json::from_slice(&stdout).context("failed to parse yt-dlp metadata")
}

fn entry_has_video_track(entry: &Value) -> bool {
    entry
        .get("formats")
        .and_then(Value::as_array)
        .is_some_and(|formats| {
            formats.iter().any(|f| {
                f.get("vcodec")
                    .and_then(Value::as_str)
                    .is_some_and(|codec| codec != "none")
            })
        })
}

/// Multi-entry (playlist) results select the first entry exhibiting an
/// actual video track rather than defaulting to the top-level wrapper.
/// Returns the URL to download, or `None` to keep the original.
pub fn select_video_entry_url(info: &Value) -> Option<String> {
    let entries = info.get("entries")?.as_array()?;
    for entry in entries {
        if entry.is_null() {
            continue;
        }
        if entry_has_video_track(entry) {
            return entry
                .get("webpage_url")
                .or_else(|| entry.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }
    None
}

/// Newest file in `dir` with the given stem and one of the given
/// extensions. yt-dlp decides the final extension, so the caller globs.
fn pick_newest(dir: &Path, stem: &str, exts: &[&str]) -> Option<PathBuf> {
    let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_stem().and_then(|s| s.to_str()) == Some(stem)
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| exts.is_empty() || exts.contains(&e.to_ascii_lowercase().as_str()))
        })
        .filter_map(|p| p.metadata().and_then(|m| m.modified()).ok().map(|t| (t, p)))
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates.into_iter().next().map(|(_, p)| p)
}

/// Downloads a video to `dir`, handling playlist wrappers. One retry pass
/// is delegated to yt-dlp itself; there is no orchestrator-level retry.
pub async fn download_video(url: &str, dir: &Path) -> Result<PathBuf> {
    let info = extract_info(url).await.unwrap_or(Value::Null);
    let target = select_video_entry_url(&info)
        .filter(|t| t != url)
        .unwrap_or_else(|| url.to_string());

    let template = dir.join("source.%(ext)s");
    let template = template.to_string_lossy().to_string();
    info!(url = %target, "downloading video with yt-dlp");
    run_ytdlp(
        &[
            "--output",
            &template,
            "--format",
            VIDEO_FORMAT,
            "--merge-output-format",
            "mp4",
            "--retries",
            "2",
            "--no-warnings",
            "--user-agent",
            BROWSER_USER_AGENT,
            &target,
        ],
        DOWNLOAD_TIMEOUT,
        "video download",
    )
    .await?;

    pick_newest(dir, "source", &["mp4", "mkv", "webm", "mov"])
        .context("yt-dlp reported success but produced no video file")
}

/// Audio-only pull extracted to m4a. This performs an actual download, not
/// just URL discovery.
pub async fn download_audio(url: &str, dir: &Path) -> Result<PathBuf> {
    let template = dir.join("audio.%(ext)s");
    let template = template.to_string_lossy().to_string();
    info!(url, "downloading audio with yt-dlp");
    run_ytdlp(
        &[
            "--output",
            &template,
            "--format",
            "bestaudio/best",
            "--no-playlist",
            "--extract-audio",
            "--audio-format",
            "m4a",
            "--audio-quality",
            "128K",
            "--no-warnings",
            url,
        ],
        DOWNLOAD_TIMEOUT,
        "audio download",
    )
    .await?;

    pick_newest(dir, "audio", &[]).context("yt-dlp reported success but produced no audio file")
}

/// Highest-resolution thumbnail from an info document.
pub fn best_thumbnail_url(info: &Value) -> Option<String> {
    let thumbs = info.get("thumbnails").and_then(Value::as_array);
    let Some(thumbs) = thumbs.filter(|t| !t.is_empty()) else {
        return info
            .get("thumbnail")
            .and_then(Value::as_str)
            .map(str::to_string);
    };
    thumbs
        .iter()
        .filter(|t| t.get("url").and_then(Value::as_str).is_some())
        .max_by_key(|t| {
            (
                t.get("width").and_then(Value::as_u64).unwrap_or(0),
                t.get("height").and_then(Value::as_u64).unwrap_or(0),
            )
        })
        .and_then(|t| t.get("url").and_then(Value::as_str))
        .map(str::to_string)
}

/// Photo candidates from an info document: direct image URLs per entry where
/// present, otherwise the best thumbnail. First-seen order, deduped.
pub fn photo_urls_from_info(info: &Value) -> Vec<String> {
    use crate::resolver::extract::{dedup_preserving_order, is_image_url};

    let mut urls = Vec::new();
    if let Some(entries) = info.get("entries").and_then(Value::as_array) {
        for entry in entries {
            let direct = entry
                .get("url")
                .or_else(|| entry.get("thumbnail"))
                .and_then(Value::as_str);
            if let Some(candidate) = direct.filter(|u| is_image_url(u)) {
                urls.push(candidate.to_string());
                continue;
            }
            if let Some(thumb) = best_thumbnail_url(entry) {
                urls.push(thumb);
            }
        }
    } else {
        if let Some(candidate) = info
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| is_image_url(u))
        {
            urls.push(candidate.to_string());
        }
        if let Some(thumb) = best_thumbnail_url(info) {
            urls.push(thumb);
        }
    }
    dedup_preserving_order(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_entry_with_real_video_track() {
        let info = json!({
            "entries": [
                {"webpage_url": "https://a", "formats": [{"vcodec": "none"}]},
                {"webpage_url": "https://b", "formats": [{"vcodec": "h264"}]}
            ]
        });
        assert_eq!(select_video_entry_url(&info).as_deref(), Some("https://b"));
    }

    #[test]
    fn test_select_entry_keeps_wrapper_when_no_video_track() {
        let info = json!({
            "entries": [{"url": "https://a", "formats": [{"vcodec": "none"}]}]
        });
        assert_eq!(select_video_entry_url(&info), None);
        assert_eq!(select_video_entry_url(&json!({"id": "single"})), None);
    }

    #[test]
    fn test_best_thumbnail_prefers_highest_resolution() {
        let info = json!({
            "thumbnails": [
                {"url": "https://t/small", "width": 100, "height": 100},
                {"url": "https://t/big", "width": 1280, "height": 720},
                {"no_url": true}
            ]
        });
        assert_eq!(best_thumbnail_url(&info).as_deref(), Some("https://t/big"));
    }

    #[test]
    fn test_best_thumbnail_falls_back_to_scalar_field() {
        let info = json!({"thumbnail": "https://t/only"});
        assert_eq!(best_thumbnail_url(&info).as_deref(), Some("https://t/only"));
        assert_eq!(best_thumbnail_url(&json!({})), None);
    }

    #[test]
    fn test_photo_urls_from_entries() {
        let info = json!({
            "entries": [
                {"url": "https://cdn/direct.jpg"},
                {"thumbnails": [{"url": "https://t/1", "width": 10}]},
                {"url": "https://cdn/direct.jpg"}
            ]
        });
        assert_eq!(
            photo_urls_from_info(&info),
            vec!["https://cdn/direct.jpg", "https://t/1"]
        );
    }

    #[test]
    fn test_pick_newest_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("source.part"), b"x").unwrap();
        std::fs::write(dir.path().join("source.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("other.mp4"), b"x").unwrap();
        let picked = pick_newest(dir.path(), "source", &["mp4", "mkv", "webm", "mov"]);
        assert_eq!(picked, Some(dir.path().join("source.mp4")));
    }
}
