//! Environment-driven configuration.
//!
//! Every setting has a default so the server starts with nothing set; without
//! `DATABASE_URL` it runs against the in-memory store and local queue.

use std::env;
use std::path::PathBuf;

use crate::constants::{DEFAULT_BEAM_SIZE, DEFAULT_LANGUAGE, DEFAULT_MODEL_PATH};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MEDIA_SERVER_PORT: u16 = 3001;
const DEFAULT_PIPELINE_CONCURRENCY: usize = 2;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub media_server_port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub media_root: PathBuf,
    pub work_dir: PathBuf,
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub model_path: PathBuf,
    pub language: String,
    pub beam_size: u32,
    pub threads: Option<usize>,
    pub transcribe_timeout_secs: Option<u64>,
    pub pipeline_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            media_server_port: DEFAULT_MEDIA_SERVER_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            media_root: PathBuf::from("media"),
            work_dir: env::temp_dir(),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            language: DEFAULT_LANGUAGE.to_string(),
            beam_size: DEFAULT_BEAM_SIZE,
            threads: None,
            transcribe_timeout_secs: None,
            pipeline_concurrency: DEFAULT_PIPELINE_CONCURRENCY,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            port: parse_positive(get("PORT")).unwrap_or(defaults.port),
            media_server_port: parse_positive(get("MEDIA_SERVER_PORT"))
                .unwrap_or(defaults.media_server_port),
            database_url: get("DATABASE_URL"),
            db_max_connections: parse_positive(get("DB_MAX_CONNECTIONS"))
                .unwrap_or(defaults.db_max_connections),
            media_root: get("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            work_dir: get("WORK_DIR").map(PathBuf::from).unwrap_or(defaults.work_dir),
            ffmpeg_bin: get("FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: get("FFPROBE_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_bin),
            model_path: get("WHISPER_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            language: get("TRANSCRIBE_LANGUAGE").unwrap_or(defaults.language),
            beam_size: parse_positive(get("WHISPER_BEAM_SIZE")).unwrap_or(defaults.beam_size),
            threads: parse_positive(get("WHISPER_THREADS")),
            transcribe_timeout_secs: parse_positive(get("TRANSCRIBE_TIMEOUT_SECS")),
            pipeline_concurrency: parse_positive(get("PIPELINE_CONCURRENCY"))
                .unwrap_or(defaults.pipeline_concurrency),
        }
    }
}

fn parse_positive<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value
        .and_then(|s| s.trim().parse::<T>().ok())
        .filter(|v| *v > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.language, "it");
        assert_eq!(config.beam_size, 1);
        assert_eq!(config.threads, None);
        assert_eq!(config.transcribe_timeout_secs, None);
        assert_eq!(config.pipeline_concurrency, 2);
        assert_eq!(config.ffmpeg_bin, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/mentions"),
            ("WHISPER_BEAM_SIZE", "5"),
            ("WHISPER_THREADS", "0"),
            ("TRANSCRIBE_TIMEOUT_SECS", "abc"),
            ("PIPELINE_CONCURRENCY", "4"),
            ("TRANSCRIBE_LANGUAGE", "en"),
            ("MEDIA_ROOT", "  "),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/mentions")
        );
        assert_eq!(config.beam_size, 5);
        assert_eq!(config.threads, None);
        assert_eq!(config.transcribe_timeout_secs, None);
        assert_eq!(config.pipeline_concurrency, 4);
        assert_eq!(config.language, "en");
        assert_eq!(config.media_root, PathBuf::from("media"));
    }
}
