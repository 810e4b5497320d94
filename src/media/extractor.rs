//! Audio extraction into a scoped per-job workspace.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::constants::{AUDIO_FILE_NAME, TARGET_CHANNELS, TARGET_SAMPLE_RATE, WORKSPACE_PREFIX};
use crate::error::MediaToolError;
use crate::media::tools::MediaTools;

/// Temporary directory owned by exactly one job.
///
/// Call [`Workspace::release`] on every exit path to get a logged removal;
/// if the job is dropped or panics first, `Drop` removes it silently.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create_in(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "[workspace] removed"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "[workspace] failed to remove"
            ),
        }
    }
}

/// Normalised audio ready for transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAudio {
    pub path: PathBuf,
    /// Probed source duration, used for progress and offset clamping.
    pub duration_secs: f64,
}

#[derive(Clone)]
pub struct AudioExtractor {
    tools: Arc<dyn MediaTools>,
    sample_rate: u32,
    channels: u16,
}

impl AudioExtractor {
    pub fn new(tools: Arc<dyn MediaTools>) -> Self {
        Self {
            tools,
            sample_rate: TARGET_SAMPLE_RATE,
            channels: TARGET_CHANNELS,
        }
    }

    /// Extract mono 16 kHz PCM from `source` into `workspace`, then probe the
    /// source duration. Either tool failing aborts the extraction.
    pub async fn extract(
        &self,
        source: &Path,
        workspace: &Workspace,
    ) -> Result<ExtractedAudio, MediaToolError> {
        let audio_path = workspace.path().join(AUDIO_FILE_NAME);

        tracing::info!(source = %source.display(), "[extract] extracting audio");
        self.tools
            .extract_audio(source, &audio_path, self.sample_rate, self.channels)
            .await?;
        tracing::info!(audio = %audio_path.display(), "[extract] audio extracted");

        let duration_secs = self.tools.probe_duration(source).await?;

        Ok(ExtractedAudio {
            path: audio_path,
            duration_secs,
        })
    }
}
