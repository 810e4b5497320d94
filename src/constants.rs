//! Application constants

/// Sample rate the recognizer expects, in Hz
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Channel count of the extracted audio (mono)
pub const TARGET_CHANNELS: u16 = 1;

/// File name of the extracted audio inside a job workspace
pub const AUDIO_FILE_NAME: &str = "audio.wav";

/// Prefix for per-job workspace directories
pub const WORKSPACE_PREFIX: &str = "mentions_job_";

/// Default transcription language hint
pub const DEFAULT_LANGUAGE: &str = "it";

/// Default beam width (1 = greedy decoding)
pub const DEFAULT_BEAM_SIZE: u32 = 1;

/// Default whisper model location
pub const DEFAULT_MODEL_PATH: &str = "models/ggml-tiny.bin";

/// Maximum upload size for videos (2 GB)
pub const MAX_VIDEO_UPLOAD_SIZE: usize = 2 * 1024 * 1024 * 1024;

/// Buffer size used when streaming file bodies
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Directory under the media root that uploads are written to
pub const UPLOAD_DIR: &str = "videos";

/// Maximum rows per INSERT statement (3 binds each, Postgres caps binds at 65535)
pub const MENTION_INSERT_CHUNK: usize = 1000;
