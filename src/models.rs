//! Shared data models used across modules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing state of an uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploaded,
    Processing,
    Ready,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
            VideoStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(VideoStatus::Uploaded),
            "processing" => Ok(VideoStatus::Processing),
            "ready" => Ok(VideoStatus::Ready),
            "failed" => Ok(VideoStatus::Failed),
            other => Err(format!("unknown video status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: VideoStatus,
    pub failure_reason: Option<String>,
}

/// Fields supplied by the upload boundary when creating a video.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub file_path: String,
    pub status: VideoStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, sqlx::FromRow)]
pub struct Player {
    pub id: i64,
    pub name: String,
}

/// A mention produced by the matcher, not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewMention {
    pub video_id: i64,
    pub player_id: i64,
    pub offset_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Mention {
    pub id: i64,
    pub video_id: i64,
    pub player_id: i64,
    pub offset_ms: i64,
}

impl Mention {
    pub fn display_timestamp(&self) -> String {
        format_offset(self.offset_ms)
    }
}

/// A player's mention joined with the video it occurs in (listing read model)
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PlayerMention {
    pub video_id: i64,
    pub video_title: String,
    pub video_file_path: String,
    pub offset_ms: i64,
}

/// Format a millisecond offset as `H:MM:SS`, flooring to whole seconds.
///
/// Hours are not padded, so `3_723_000` renders as `1:02:03` and
/// `12_400` as `0:00:12`.
pub fn format_offset(offset_ms: i64) -> String {
    let total = offset_ms.max(0) / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Convert a decoder offset in seconds to milliseconds, clamped to
/// `[0, duration]` when the duration is known.
pub fn offset_ms_from_secs(start_secs: f64, duration_secs: Option<f64>) -> i64 {
    let mut ms = if start_secs.is_finite() {
        (start_secs * 1000.0).round() as i64
    } else {
        0
    };
    if let Some(duration) = duration_secs.filter(|d| d.is_finite() && *d >= 0.0) {
        ms = ms.min((duration * 1000.0).round() as i64);
    }
    ms.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0), "0:00:00");
        assert_eq!(format_offset(12_400), "0:00:12");
        assert_eq!(format_offset(60_000), "0:01:00");
        assert_eq!(format_offset(3_723_999), "1:02:03");
        assert_eq!(format_offset(36 * 3600 * 1000), "36:00:00");
    }

    #[test]
    fn test_numeric_offsets_sort_where_strings_would_not() {
        let mut offsets = vec![600_000, 36_000_000, 545_000, 32_400_000];
        offsets.sort();
        let display: Vec<String> = offsets.iter().map(|o| format_offset(*o)).collect();
        assert_eq!(display, vec!["0:09:05", "0:10:00", "9:00:00", "10:00:00"]);

        let mut as_strings = display.clone();
        as_strings.sort();
        assert_ne!(as_strings, display);
    }

    #[test]
    fn test_offset_clamping() {
        assert_eq!(offset_ms_from_secs(12.4, Some(125.0)), 12_400);
        assert_eq!(offset_ms_from_secs(-0.02, Some(125.0)), 0);
        assert_eq!(offset_ms_from_secs(130.0, Some(125.0)), 125_000);
        assert_eq!(offset_ms_from_secs(130.0, None), 130_000);
        assert_eq!(offset_ms_from_secs(f64::NAN, None), 0);
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            VideoStatus::Uploaded,
            VideoStatus::Processing,
            VideoStatus::Ready,
            VideoStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<VideoStatus>(), Ok(status));
        }
        assert!("done".parse::<VideoStatus>().is_err());
    }
}
