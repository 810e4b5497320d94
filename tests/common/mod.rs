#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use video_mentions::error::{MediaToolError, StoreError, SubmitError, TranscriptionError};
use video_mentions::jobs::JobSubmitter;
use video_mentions::media::MediaTools;
use video_mentions::models::{
    Mention, NewMention, NewVideo, Player, PlayerMention, Video, VideoStatus,
};
use video_mentions::store::{MemoryStore, VideoStore};
use video_mentions::transcribe::{
    DecodeOptions, Segment, SpeechRecognizer, Transcript, WordToken,
};

/// Stand-in for ffmpeg/ffprobe: writes a placeholder WAV and reports a fixed
/// duration.
pub struct FakeTools {
    pub duration_secs: f64,
    pub fail_extract: bool,
    pub fail_probe: bool,
    pub extracted: Mutex<Vec<PathBuf>>,
}

impl FakeTools {
    pub fn with_duration(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            fail_extract: false,
            fail_probe: false,
            extracted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_extract() -> Self {
        Self {
            fail_extract: true,
            ..Self::with_duration(125.0)
        }
    }
}

#[async_trait]
impl MediaTools for FakeTools {
    async fn probe_duration(&self, _path: &Path) -> Result<f64, MediaToolError> {
        if self.fail_probe {
            return Err(MediaToolError::UnparsableOutput {
                tool: "ffprobe".to_string(),
                output: "N/A".to_string(),
            });
        }
        Ok(self.duration_secs)
    }

    async fn extract_audio(
        &self,
        _source: &Path,
        dest: &Path,
        _sample_rate: u32,
        _channels: u16,
    ) -> Result<(), MediaToolError> {
        self.extracted.lock().unwrap().push(dest.to_path_buf());
        if self.fail_extract {
            return Err(MediaToolError::Failed {
                tool: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        tokio::fs::write(dest, b"RIFF").await.map_err(|e| MediaToolError::Spawn {
            tool: "ffmpeg".to_string(),
            source: e,
        })
    }
}

pub enum Script {
    Words(Vec<(&'static str, f64)>),
    Fail,
    FailMidway(Vec<(&'static str, f64)>),
    Sleep(Duration),
}

/// Recognizer that replays a scripted transcript.
pub struct FakeRecognizer {
    pub script: Script,
    pub calls: Mutex<Vec<DecodeOptions>>,
}

impl FakeRecognizer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn words(words: Vec<(&'static str, f64)>) -> Self {
        Self::new(Script::Words(words))
    }
}

fn to_segments(words: &[(&'static str, f64)]) -> Vec<Segment> {
    words
        .iter()
        .map(|(text, start)| Segment::from_words(vec![WordToken::new(*text, *start)]))
        .collect()
}

impl SpeechRecognizer for FakeRecognizer {
    fn transcribe(
        &self,
        audio: &Path,
        options: &DecodeOptions,
    ) -> Result<Transcript, TranscriptionError> {
        assert!(audio.exists(), "audio should be extracted before transcription");
        self.calls.lock().unwrap().push(options.clone());

        match &self.script {
            Script::Words(words) => Ok(Transcript::from_segments(to_segments(words))),
            Script::Fail => Err(TranscriptionError::Inference {
                message: "decoder crashed".to_string(),
            }),
            Script::FailMidway(words) => {
                let segments = to_segments(words).into_iter().map(Ok).chain(std::iter::once(
                    Err(TranscriptionError::Inference {
                        message: "decoder crashed midway".to_string(),
                    }),
                ));
                Ok(Transcript::new(segments))
            }
            Script::Sleep(duration) => {
                std::thread::sleep(*duration);
                Ok(Transcript::empty())
            }
        }
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

/// Memory store whose bulk insert always fails.
#[derive(Default)]
pub struct FailingInsertStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl VideoStore for FailingInsertStore {
    async fn create_video(&self, video: NewVideo) -> Result<Video, StoreError> {
        self.inner.create_video(video).await
    }

    async fn get_video(&self, video_id: i64) -> Result<Option<Video>, StoreError> {
        self.inner.get_video(video_id).await
    }

    async fn set_status(
        &self,
        video_id: i64,
        status: VideoStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), StoreError> {
        self.inner.set_status(video_id, status, failure_reason).await
    }

    async fn get_or_create_player(&self, name: &str) -> Result<Player, StoreError> {
        self.inner.get_or_create_player(name).await
    }

    async fn get_player(&self, player_id: i64) -> Result<Option<Player>, StoreError> {
        self.inner.get_player(player_id).await
    }

    async fn list_players(&self) -> Result<Vec<Player>, StoreError> {
        self.inner.list_players().await
    }

    async fn insert_mentions(&self, _mentions: &[NewMention]) -> Result<u64, StoreError> {
        Err(StoreError::Invalid("connection reset during insert".to_string()))
    }

    async fn list_videos_by_status(&self, status: VideoStatus) -> Result<Vec<Video>, StoreError> {
        self.inner.list_videos_by_status(status).await
    }

    async fn list_mentions_for_player(
        &self,
        player_id: i64,
        video_status: VideoStatus,
    ) -> Result<Vec<PlayerMention>, StoreError> {
        self.inner
            .list_mentions_for_player(player_id, video_status)
            .await
    }

    async fn list_mentions_for_video(&self, video_id: i64) -> Result<Vec<Mention>, StoreError> {
        self.inner.list_mentions_for_video(video_id).await
    }
}

/// Submitter that records jobs instead of running them.
#[derive(Default)]
pub struct RecordingSubmitter {
    pub jobs: Mutex<Vec<(i64, String)>>,
    pub fail: bool,
}

#[async_trait]
impl JobSubmitter for RecordingSubmitter {
    async fn submit(&self, video_id: i64, player_names: &str) -> Result<(), SubmitError> {
        if self.fail {
            return Err(SubmitError::Closed);
        }
        self.jobs
            .lock()
            .unwrap()
            .push((video_id, player_names.to_string()));
        Ok(())
    }
}

pub async fn processing_video(store: &dyn VideoStore, title: &str) -> Video {
    store
        .create_video(NewVideo {
            title: title.to_string(),
            file_path: format!("videos/{}", title),
            status: VideoStatus::Processing,
        })
        .await
        .unwrap()
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
