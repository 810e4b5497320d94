//! Loading extracted PCM audio for the recognizer.

use std::path::Path;

use crate::constants::{TARGET_CHANNELS, TARGET_SAMPLE_RATE};
use crate::error::TranscriptionError;

/// Read a mono 16 kHz 16-bit WAV as f32 samples in `[-1.0, 1.0]`.
pub fn load_pcm_f32(path: &Path) -> Result<Vec<f32>, TranscriptionError> {
    let audio_error = |message: String| TranscriptionError::Audio {
        path: path.display().to_string(),
        message,
    };

    let mut reader = hound::WavReader::open(path).map_err(|e| audio_error(e.to_string()))?;
    let spec = reader.spec();

    if spec.channels != TARGET_CHANNELS {
        return Err(audio_error(format!(
            "expected {} channel(s), got {}",
            TARGET_CHANNELS, spec.channels
        )));
    }
    if spec.sample_rate != TARGET_SAMPLE_RATE {
        return Err(audio_error(format!(
            "expected {} Hz, got {} Hz",
            TARGET_SAMPLE_RATE, spec.sample_rate
        )));
    }
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(audio_error(format!(
            "expected 16-bit integer PCM, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect::<Result<Vec<f32>, _>>()
        .map_err(|e| audio_error(e.to_string()))
}
