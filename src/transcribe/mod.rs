//! Speech-to-text with word-level timestamps.
//!
//! A [`SpeechRecognizer`] is loaded once per process and shared immutably
//! between jobs; every [`SpeechRecognizer::transcribe`] call owns its own
//! decoder state. The resulting [`Transcript`] is consumed exactly once.

pub mod audio;
pub mod whisper;

use std::path::Path;

use crate::constants::{DEFAULT_BEAM_SIZE, DEFAULT_LANGUAGE};
use crate::error::TranscriptionError;

pub use whisper::{WhisperConfig, WhisperRecognizer};

/// One recognised word and the offset, in seconds, at which it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct WordToken {
    pub text: String,
    pub start: f64,
}

impl WordToken {
    pub fn new(text: impl Into<String>, start: f64) -> Self {
        Self {
            text: text.into(),
            start,
        }
    }
}

/// A chronologically ordered run of words.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub words: Vec<WordToken>,
}

impl Segment {
    /// Build a segment spanning its words.
    pub fn from_words(words: Vec<WordToken>) -> Self {
        let start = words.first().map(|w| w.start).unwrap_or(0.0);
        let end = words.last().map(|w| w.start).unwrap_or(start);
        Self { start, end, words }
    }
}

/// Decoding parameters for one transcription call.
///
/// Word timestamps are always produced; there is no switch to turn them off.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    pub language: String,
    pub beam_size: u32,
    pub threads: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            beam_size: DEFAULT_BEAM_SIZE,
            threads: None,
        }
    }
}

/// Finite, forward-only sequence of segments.
///
/// Not `Clone`: iterating it drains the underlying decode, so a second pass
/// requires a second `transcribe` call.
pub struct Transcript {
    segments: Box<dyn Iterator<Item = Result<Segment, TranscriptionError>> + Send>,
}

impl Transcript {
    pub fn new<I>(segments: I) -> Self
    where
        I: Iterator<Item = Result<Segment, TranscriptionError>> + Send + 'static,
    {
        Self {
            segments: Box::new(segments),
        }
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self::new(segments.into_iter().map(Ok))
    }

    pub fn empty() -> Self {
        Self::from_segments(Vec::new())
    }
}

impl Iterator for Transcript {
    type Item = Result<Segment, TranscriptionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.segments.next()
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript").finish_non_exhaustive()
    }
}

/// A loaded speech recognition model.
///
/// `transcribe` blocks for the full decode; callers run it off the async
/// executor (see `pipeline`).
pub trait SpeechRecognizer: Send + Sync {
    fn transcribe(
        &self,
        audio: &Path,
        options: &DecodeOptions,
    ) -> Result<Transcript, TranscriptionError>;

    fn model_name(&self) -> &str;
}
