use std::path::Path;

use video_mentions::error::TranscriptionError;
use video_mentions::transcribe::{WhisperConfig, WhisperRecognizer, whisper};

#[test]
fn test_default_features_include_whisper() {
    let manifest = std::fs::read_to_string(Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"))
        .unwrap();
    let default_line = manifest
        .lines()
        .find(|line| line.trim_start().starts_with("default ="))
        .expect("manifest declares default features");
    assert!(default_line.contains("\"whisper\""), "{}", default_line);
}

#[cfg(feature = "whisper")]
#[test]
fn test_default_build_has_a_real_recognizer() {
    assert!(whisper::is_available());
}

#[cfg(feature = "whisper")]
#[test]
fn test_invalid_model_file_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("ggml-tiny.bin");
    std::fs::write(&model_path, b"not a ggml model").unwrap();

    let result = WhisperRecognizer::new(WhisperConfig { model_path });
    assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
}

#[cfg(not(feature = "whisper"))]
#[test]
fn test_stub_build_reports_no_backend() {
    use video_mentions::transcribe::{DecodeOptions, SpeechRecognizer};

    assert!(!whisper::is_available());

    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("ggml-tiny.bin");
    std::fs::write(&model_path, b"fake model").unwrap();
    let recognizer = WhisperRecognizer::new(WhisperConfig { model_path }).unwrap();
    assert!(matches!(
        recognizer.transcribe(Path::new("audio.wav"), &DecodeOptions::default()),
        Err(TranscriptionError::Disabled)
    ));
}
