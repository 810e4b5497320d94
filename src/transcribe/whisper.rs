//! Whisper-backed [`SpeechRecognizer`] using whisper-rs.
//!
//! The `whisper` feature is on by default (building whisper.cpp needs cmake).
//! With `--no-default-features` a stub with the same constructor is compiled,
//! every transcription fails with [`TranscriptionError::Disabled`], and
//! [`is_available`] reports false so binaries can refuse to start.

use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_MODEL_PATH;
use crate::error::TranscriptionError;
use crate::transcribe::{DecodeOptions, Segment, SpeechRecognizer, Transcript, WordToken};

#[cfg(feature = "whisper")]
use crate::transcribe::audio;
#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to a ggml model file
    pub model_path: PathBuf,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

/// Whether a real recognizer was compiled in.
pub const fn is_available() -> bool {
    cfg!(feature = "whisper")
}

/// Turn one whisper segment (centisecond timestamps) into a single-word
/// [`Segment`]. Blank text yields `None`.
pub fn segment_to_word(text: &str, start_cs: i64, end_cs: i64) -> Option<Segment> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let start = start_cs.max(0) as f64 / 100.0;
    let end = (end_cs.max(start_cs).max(0)) as f64 / 100.0;
    Some(Segment {
        start,
        end,
        words: vec![WordToken::new(text, start)],
    })
}

fn model_name_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
pub struct WhisperRecognizer {
    context: Mutex<WhisperContext>,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperRecognizer {
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperRecognizer {
    /// Load the model. This is the expensive step; do it once per process.
    pub fn new(config: WhisperConfig) -> Result<Self, TranscriptionError> {
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(TranscriptionError::ModelNotFound {
                path: config.model_path.display().to_string(),
            });
        }

        let model_path = config
            .model_path
            .to_str()
            .ok_or_else(|| TranscriptionError::ModelLoad {
                message: "model path is not valid UTF-8".to_string(),
            })?;

        let context = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| TranscriptionError::ModelLoad {
                message: e.to_string(),
            })?;

        Ok(Self {
            context: Mutex::new(context),
            model_name: model_name_of(&config.model_path),
        })
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperRecognizer {
    /// Stub constructor: validates the model path only.
    pub fn new(config: WhisperConfig) -> Result<Self, TranscriptionError> {
        if !config.model_path.exists() {
            return Err(TranscriptionError::ModelNotFound {
                path: config.model_path.display().to_string(),
            });
        }
        Ok(Self {
            model_name: model_name_of(&config.model_path),
        })
    }
}

#[cfg(feature = "whisper")]
impl SpeechRecognizer for WhisperRecognizer {
    fn transcribe(
        &self,
        audio_path: &Path,
        options: &DecodeOptions,
    ) -> Result<Transcript, TranscriptionError> {
        let samples = audio::load_pcm_f32(audio_path)?;

        // The context is only locked to spawn a state; decoding runs unlocked.
        let mut state = {
            let context = self
                .context
                .lock()
                .map_err(|e| TranscriptionError::Inference {
                    message: format!("failed to acquire context lock: {}", e),
                })?;
            context
                .create_state()
                .map_err(|e| TranscriptionError::Inference {
                    message: format!("failed to create whisper state: {}", e),
                })?
        };

        let strategy = if options.beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size: options.beam_size as i32,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        };
        let mut params = FullParams::new(strategy);
        params.set_language(Some(&options.language));
        if let Some(threads) = options.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        // One word per segment, each carrying its own start offset
        params.set_token_timestamps(true);
        params.set_split_on_word(true);
        params.set_max_len(1);

        state
            .full(params, &samples)
            .map_err(|e| TranscriptionError::Inference {
                message: e.to_string(),
            })?;

        let segments: Vec<Segment> = state
            .as_iter()
            .filter_map(|segment| {
                segment_to_word(
                    &segment.to_string(),
                    segment.start_timestamp(),
                    segment.end_timestamp(),
                )
            })
            .collect();

        tracing::debug!(
            model = %self.model_name,
            segments = segments.len(),
            "[transcribe] decode finished"
        );
        Ok(Transcript::from_segments(segments))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl SpeechRecognizer for WhisperRecognizer {
    fn transcribe(
        &self,
        _audio: &Path,
        _options: &DecodeOptions,
    ) -> Result<Transcript, TranscriptionError> {
        Err(TranscriptionError::Disabled)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_reported() {
        let result = WhisperRecognizer::new(WhisperConfig {
            model_path: PathBuf::from("/nonexistent/ggml-tiny.bin"),
        });
        match result {
            Err(TranscriptionError::ModelNotFound { path }) => {
                assert_eq!(path, "/nonexistent/ggml-tiny.bin")
            }
            other => panic!("expected ModelNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_segment_to_word_converts_centiseconds() {
        let segment = segment_to_word(" Rossi ", 1240, 1275).unwrap();
        assert_eq!(segment.start, 12.4);
        assert_eq!(segment.end, 12.75);
        assert_eq!(segment.words, vec![WordToken::new("Rossi", 12.4)]);
    }

    #[test]
    fn test_segment_to_word_skips_blank_text() {
        assert_eq!(segment_to_word("", 0, 10), None);
        assert_eq!(segment_to_word("  \n", 100, 110), None);
    }

    #[test]
    fn test_segment_to_word_never_ends_before_start() {
        let segment = segment_to_word("bianchi", 6000, 5990).unwrap();
        assert_eq!(segment.start, 60.0);
        assert_eq!(segment.end, 60.0);
    }

    #[test]
    fn test_availability_follows_feature() {
        assert_eq!(is_available(), cfg!(feature = "whisper"));
    }

    #[test]
    fn test_model_name_from_file_stem() {
        assert_eq!(model_name_of(Path::new("models/ggml-tiny.bin")), "ggml-tiny");
        assert_eq!(model_name_of(Path::new("/")), "unknown");
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn test_stub_refuses_to_transcribe() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("ggml-tiny.bin");
        std::fs::write(&model_path, b"fake model").unwrap();

        let recognizer = WhisperRecognizer::new(WhisperConfig { model_path }).unwrap();
        assert_eq!(recognizer.model_name(), "ggml-tiny");
        let result = recognizer.transcribe(Path::new("audio.wav"), &DecodeOptions::default());
        assert!(matches!(result, Err(TranscriptionError::Disabled)));
    }
}
