//! Typed wrapper around the `ffprobe` and `ffmpeg` command-line tools.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::MediaToolError;

/// Duration probing and audio extraction.
///
/// Calls run to completion with no retry; a failing tool surfaces as
/// [`MediaToolError`] to the caller.
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Container duration of `path` in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaToolError>;

    /// Strip video, resample and downmix `source` into 16-bit PCM at `dest`,
    /// overwriting it.
    async fn extract_audio(
        &self,
        source: &Path,
        dest: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> Result<(), MediaToolError>;
}

/// The production [`MediaTools`], shelling out to ffmpeg/ffprobe.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg_bin: PathBuf,
    ffprobe_bin: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Ffmpeg {
    pub fn new(ffmpeg_bin: impl Into<PathBuf>, ffprobe_bin: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

#[async_trait]
impl MediaTools for Ffmpeg {
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaToolError> {
        let tool = tool_name(&self.ffprobe_bin);
        let output = Command::new(&self.ffprobe_bin)
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| MediaToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaToolError::Failed {
                tool,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_duration(&tool, &output.stdout)
    }

    async fn extract_audio(
        &self,
        source: &Path,
        dest: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> Result<(), MediaToolError> {
        let tool = tool_name(&self.ffmpeg_bin);
        let output = Command::new(&self.ffmpeg_bin)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .arg("-i")
            .arg(source)
            .arg("-vn")
            .args(["-acodec", "pcm_s16le"])
            .args(["-ar", &sample_rate.to_string()])
            .args(["-ac", &channels.to_string()])
            .arg("-y")
            .arg(dest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| MediaToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaToolError::Failed {
                tool,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Parse the prober's plain-text duration output.
pub fn parse_duration(tool: &str, stdout: &[u8]) -> Result<f64, MediaToolError> {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaToolError::UnparsableOutput {
            tool: tool.to_string(),
            output: trimmed.to_string(),
        })
}

fn tool_name(bin: &Path) -> String {
    bin.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| bin.display().to_string())
}
