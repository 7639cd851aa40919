use std::path::Path;
use std::process::{Command, Stdio};

use async_trait::async_trait;
use tracing::{debug, info};

use super::CompositionGraph;
use crate::config::EncodeConfig;
use crate::error::{ReelError, Result};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            ReelError::ExternalEngine(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(ReelError::ExternalEngine("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Turns a composition graph into a video file.
#[async_trait]
pub trait VideoCompositingEngine: Send + Sync {
    async fn encode(
        &self,
        graph: &CompositionGraph,
        settings: &EncodeConfig,
        output: &Path,
    ) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Full FFmpeg argument list for encoding `graph` into `output`.
pub fn encode_args(graph: &CompositionGraph, settings: &EncodeConfig, output: &Path) -> Vec<String> {
    let mut args = vec!["-y".to_string()];

    for input in &graph.inputs {
        args.extend(input.options.iter().cloned());
        args.push("-i".to_string());
        args.push(input.location.clone());
    }

    args.extend([
        "-filter_complex".to_string(),
        graph.filter_complex(),
        "-map".to_string(),
        graph.video_output.to_string(),
        "-map".to_string(),
        graph.audio_map.clone(),
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-crf".to_string(),
        settings.crf.to_string(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-c:a".to_string(),
        graph.audio_codec.clone(),
        "-t".to_string(),
        graph.duration_secs.to_string(),
    ]);
    args.push(output.display().to_string());
    args
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegEngine;

#[async_trait]
impl VideoCompositingEngine for FfmpegEngine {
    async fn encode(
        &self,
        graph: &CompositionGraph,
        settings: &EncodeConfig,
        output: &Path,
    ) -> Result<()> {
        check_ffmpeg()?;

        let args = encode_args(graph, settings, output);
        debug!("ffmpeg {}", args.join(" "));

        let result = Command::new("ffmpeg")
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ReelError::ExternalEngine(format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(ReelError::ExternalEngine(format!(
                "FFmpeg encoding failed: {}",
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }

        info!("Video written to {}", output.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FFmpeg"
    }
}

/// Cut `[start_ms, end_ms)` out of a recitation without re-encoding.
pub async fn trim_audio(input: &Path, output: &Path, start_ms: u64, end_ms: u64) -> Result<()> {
    check_ffmpeg()?;

    if !input.exists() {
        return Err(ReelError::FileNotFound(input.display().to_string()));
    }

    let duration_ms = end_ms.saturating_sub(start_ms);
    if duration_ms == 0 {
        return Err(ReelError::ExternalEngine(
            "Audio segment duration is zero".to_string(),
        ));
    }

    let start_secs = format!("{:.3}", start_ms as f64 / 1000.0);
    let duration_secs = format!("{:.3}", duration_ms as f64 / 1000.0);

    debug!(
        "Trimming audio: start={}, duration={}",
        start_secs, duration_secs
    );

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-ss"])
        .arg(&start_secs)
        .args(["-t"])
        .arg(&duration_secs)
        .args(["-map", "0:a", "-c:a", "copy"])
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| ReelError::ExternalEngine(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(ReelError::ExternalEngine(
            "FFmpeg audio trim failed".to_string(),
        ));
    }

    Ok(())
}
