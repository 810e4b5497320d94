//! Error types for the ingest pipeline, the record store and job submission.

use thiserror::Error;

/// A prober/transcoder invocation failed.
#[derive(Error, Debug)]
pub enum MediaToolError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} produced unparsable output: {output:?}")]
    UnparsableOutput { tool: String, output: String },
}

/// Speech recognition could not produce a transcript.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("transcription model not found at {path}")]
    ModelNotFound { path: String },

    #[error("failed to load transcription model: {message}")]
    ModelLoad { message: String },

    #[error("unsupported audio in {path}: {message}")]
    Audio { path: String, message: String },

    #[error("transcription inference failed: {message}")]
    Inference { message: String },

    #[error("transcription exceeded {secs}s timeout")]
    TimedOut { secs: u64 },

    #[error("speech recognition is not compiled in (enable the `whisper` feature)")]
    Disabled,

    #[error("transcription worker failed: {message}")]
    Worker { message: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("video {0} not found")]
    VideoNotFound(i64),

    #[error("player {0} not found")]
    PlayerNotFound(i64),

    #[error("invalid stored value: {0}")]
    Invalid(String),
}

/// Any failure that aborts one pipeline job.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("video {0} not found")]
    VideoNotFound(i64),

    #[error("workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    #[error(transparent)]
    MediaTool(#[from] MediaToolError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error("failed to compile vocabulary matcher: {0}")]
    Matcher(#[from] regex::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("job queue rejected submission: {0}")]
    Queue(String),

    #[error("job queue is closed")]
    Closed,
}
