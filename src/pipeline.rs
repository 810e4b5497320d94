//! Video indexing pipeline.
//!
//! One run takes a video from `processing` to `ready`: resolve the player
//! vocabulary, extract audio into a private workspace, transcribe, match
//! tokens against the vocabulary and persist the mentions in bulk. Any
//! failure after the video is loaded moves it to `failed` with the error text.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{PipelineError, TranscriptionError};
use crate::matcher::{MentionMatcher, Vocabulary};
use crate::media::{AudioExtractor, ExtractedAudio, MediaTools, Workspace};
use crate::models::{NewMention, Video, VideoStatus};
use crate::store::VideoStore;
use crate::transcribe::{DecodeOptions, SpeechRecognizer};

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessedVideo {
    pub video_id: i64,
    pub mentions: u64,
}

/// Everything a job needs, shared by all jobs of a worker.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn VideoStore>,
    extractor: AudioExtractor,
    recognizer: Arc<dyn SpeechRecognizer>,
    decode: DecodeOptions,
    media_root: PathBuf,
    work_dir: PathBuf,
    transcribe_timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn VideoStore>,
        tools: Arc<dyn MediaTools>,
        recognizer: Arc<dyn SpeechRecognizer>,
        media_root: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            extractor: AudioExtractor::new(tools),
            recognizer,
            decode: DecodeOptions::default(),
            media_root: media_root.into(),
            work_dir: work_dir.into(),
            transcribe_timeout: None,
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn VideoStore>,
        tools: Arc<dyn MediaTools>,
        recognizer: Arc<dyn SpeechRecognizer>,
    ) -> Self {
        Self::new(store, tools, recognizer, &config.media_root, &config.work_dir)
            .with_decode_options(DecodeOptions {
                language: config.language.clone(),
                beam_size: config.beam_size,
                threads: config.threads,
            })
            .with_transcribe_timeout(config.transcribe_timeout_secs.map(Duration::from_secs))
    }

    pub fn with_decode_options(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    pub fn with_transcribe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transcribe_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn VideoStore> {
        &self.store
    }

    /// Run one indexing job. A missing video is an error with no status write.
    pub async fn run(
        &self,
        video_id: i64,
        player_names: &str,
    ) -> Result<ProcessedVideo, PipelineError> {
        let video = self
            .store
            .get_video(video_id)
            .await?
            .ok_or(PipelineError::VideoNotFound(video_id))?;

        tracing::info!(
            video_id,
            title = %video.title,
            recognizer = %self.recognizer.model_name(),
            "[pipeline] job started"
        );

        match self.process(&video, player_names).await {
            Ok(mentions) => {
                tracing::info!(video_id, mentions, "[pipeline] video ready");
                Ok(ProcessedVideo { video_id, mentions })
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(video_id, error = %reason, "[pipeline] job failed");
                if let Err(status_err) = self
                    .store
                    .set_status(video_id, VideoStatus::Failed, Some(&reason))
                    .await
                {
                    tracing::error!(video_id, error = %status_err, "[pipeline] could not mark video failed");
                }
                Err(e)
            }
        }
    }

    async fn process(&self, video: &Video, player_names: &str) -> Result<u64, PipelineError> {
        if video.status != VideoStatus::Processing {
            tracing::info!(video_id = video.id, from = %video.status, "[pipeline] moving video to processing");
            self.store
                .set_status(video.id, VideoStatus::Processing, None)
                .await?;
        }

        let store = self.store.clone();
        let vocabulary = Vocabulary::from_csv(player_names, |name| {
            let store = store.clone();
            async move { store.get_or_create_player(&name).await }
        })
        .await?;
        tracing::info!(video_id = video.id, players = vocabulary.len(), "[pipeline] vocabulary resolved");
        let matcher = MentionMatcher::compile(vocabulary)?;

        let workspace = Workspace::create_in(&self.work_dir).map_err(PipelineError::Workspace)?;
        let indexed = self.index(video, matcher, &workspace).await;
        workspace.release();
        let inserted = indexed?;

        self.store
            .set_status(video.id, VideoStatus::Ready, None)
            .await?;
        Ok(inserted)
    }

    /// Extract, transcribe, match and persist. Runs entirely inside `workspace`.
    async fn index(
        &self,
        video: &Video,
        matcher: MentionMatcher,
        workspace: &Workspace,
    ) -> Result<u64, PipelineError> {
        let source = self.media_root.join(&video.file_path);
        let audio = self.extractor.extract(&source, workspace).await?;
        tracing::info!(video_id = video.id, duration_secs = audio.duration_secs, "[pipeline] audio ready");

        let mentions = self.transcribe_and_match(video.id, audio, matcher).await?;
        tracing::info!(video_id = video.id, candidates = mentions.len(), "[pipeline] transcript scanned");

        Ok(self.store.insert_mentions(&mentions).await?)
    }

    async fn transcribe_and_match(
        &self,
        video_id: i64,
        audio: ExtractedAudio,
        matcher: MentionMatcher,
    ) -> Result<Vec<NewMention>, TranscriptionError> {
        let recognizer = self.recognizer.clone();
        let options = self.decode.clone();

        let task = tokio::task::spawn_blocking(move || {
            let transcript = recognizer.transcribe(&audio.path, &options)?;
            matcher.scan(transcript, video_id, Some(audio.duration_secs))
        });

        // The blocking decode cannot be interrupted; on timeout it finishes
        // in the background and its result is discarded.
        let joined = match self.transcribe_timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| TranscriptionError::TimedOut {
                    secs: limit.as_secs(),
                })?,
            None => task.await,
        };

        joined.map_err(|e| TranscriptionError::Worker {
            message: e.to_string(),
        })?
    }
}
