//! Thin wrappers around the ffmpeg/ffprobe binaries. Non-zero exit is a hard
//! failure for that call.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

const ENCODE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Centered-square crop filter: even-sized square from the shorter edge,
/// scaled to 640x640.
const SQUARE_CROP_FILTER: &str = "crop='floor(min(iw,ih)/2)*2':'floor(min(iw,ih)/2)*2':\
     (iw-ow)/2:(ih-oh)/2,scale=640:640,setsar=1";

async fn run_ffmpeg(args: &[&str], what: &str) -> Result<()> {
    debug!(what, "running ffmpeg");
    let output = tokio::time::timeout(
        ENCODE_TIMEOUT,
        Command::new("ffmpeg").args(args).output(),
    )
    .await
    .with_context(|| format!("{what} timed out"))?
    .with_context(|| format!("failed to run ffmpeg for {what}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{what} failed: {}", stderr.trim());
    }
    Ok(())
}

/// Re-encodes a video for circular playback: centered square, at most
/// 640x640, trimmed to 60 seconds, H.264/AAC faststart MP4.
pub async fn process_video_note(input: &Path, output: &Path) -> Result<()> {
    let input = input.to_string_lossy().to_string();
    let output = output.to_string_lossy().to_string();
    run_ffmpeg(
        &[
            "-y", "-i", &input, "-t", "60", "-vf", SQUARE_CROP_FILTER, "-c:v", "libx264",
            "-preset", "veryfast", "-crf", "30", "-pix_fmt", "yuv420p", "-c:a", "aac", "-b:a",
            "64k", "-movflags", "+faststart", &output,
        ],
        "video note encode",
    )
    .await
}

/// Extracts the audio-only track from a video file as AAC.
pub async fn extract_audio(input: &Path, output: &Path) -> Result<()> {
    let input = input.to_string_lossy().to_string();
    let output = output.to_string_lossy().to_string();
    run_ffmpeg(
        &[
            "-y", "-i", &input, "-vn", "-c:a", "aac", "-b:a", "128k", "-movflags", "+faststart",
            &output,
        ],
        "audio extraction",
    )
    .await
}

/// Probes a file's duration in seconds. `None` when ffprobe cannot tell.
pub async fn probe_duration(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}
