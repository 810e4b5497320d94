//! Byte-range file streaming for media playback.
//!
//! Only the first range of a `Range` header is honoured. A header that cannot
//! be parsed is ignored and the whole file is served.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::constants::STREAM_CHUNK_SIZE;

/// How a request's `Range` header applies to a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// No header, or an empty file: serve everything with 200.
    Full,
    /// Inclusive byte range, already clamped to the file.
    Partial { start: u64, end: u64 },
    /// Start lies past the end of a non-empty file.
    Unsatisfiable,
    /// Header present but unparsable; served like [`RangeSpec::Full`].
    Malformed,
}

/// Resolve a raw `Range` header value against a file of `size` bytes.
pub fn parse_range(header: Option<&str>, size: u64) -> RangeSpec {
    let Some(value) = header else {
        return RangeSpec::Full;
    };
    let Some((start, end)) = parse_first_byte_range(value) else {
        return RangeSpec::Malformed;
    };

    if size == 0 {
        return RangeSpec::Full;
    }

    let start = start.unwrap_or(0);
    if start >= size {
        return RangeSpec::Unsatisfiable;
    }
    let end = end.map_or(size - 1, |e| e.min(size - 1));

    RangeSpec::Partial { start, end }
}

/// `bytes=<start>-<end>` with either bound optional. `None` when malformed.
fn parse_first_byte_range(value: &str) -> Option<(Option<u64>, Option<u64>)> {
    let ranges = value.trim().strip_prefix("bytes=")?;
    let first = ranges.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;

    let parse_bound = |s: &str| -> Result<Option<u64>, ()> {
        let s = s.trim();
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse::<u64>().map(Some).map_err(|_| ())
        }
    };

    let start = parse_bound(start).ok()?;
    let end = parse_bound(end).ok()?;

    match (start, end) {
        (None, None) => None,
        (Some(s), Some(e)) if s > e => None,
        bounds => Some(bounds),
    }
}

pub fn content_type_for(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".mp4") || lower.ends_with(".m4v") {
        "video/mp4"
    } else if lower.ends_with(".webm") {
        "video/webm"
    } else if lower.ends_with(".mov") {
        "video/quicktime"
    } else if lower.ends_with(".mkv") {
        "video/x-matroska"
    } else if lower.ends_with(".avi") {
        "video/x-msvideo"
    } else if lower.ends_with(".wav") {
        "audio/wav"
    } else {
        "application/octet-stream"
    }
}

/// Reject request paths that could escape the media root.
fn is_traversal(path: &str) -> bool {
    path.contains("..") || path.contains('\0') || path.starts_with('/') || path.starts_with('\\')
}

enum Resolved {
    File(PathBuf),
    Forbidden,
    NotFound,
}

async fn resolve(root: &Path, path: &str) -> io::Result<Resolved> {
    if is_traversal(path) {
        return Ok(Resolved::Forbidden);
    }

    let canonical = match tokio::fs::canonicalize(root.join(path)).await {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Resolved::NotFound),
        Err(e) => return Err(e),
    };
    let root = match tokio::fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Resolved::NotFound),
        Err(e) => return Err(e),
    };

    // Symlinks may still point outside the root
    if !canonical.starts_with(&root) {
        return Ok(Resolved::Forbidden);
    }
    if !tokio::fs::metadata(&canonical).await?.is_file() {
        return Ok(Resolved::NotFound);
    }
    Ok(Resolved::File(canonical))
}

/// Serve `path` under `root`, honouring the request's `Range` header.
pub async fn serve_file(root: &Path, path: &str, headers: &HeaderMap) -> Response {
    match try_serve_file(root, path, headers).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(path, error = %e, "[stream] failed to serve file");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn try_serve_file(root: &Path, path: &str, headers: &HeaderMap) -> io::Result<Response> {
    let file_path = match resolve(root, path).await? {
        Resolved::File(p) => p,
        Resolved::Forbidden => {
            tracing::warn!(path, "[stream] rejected path outside media root");
            return Ok(StatusCode::FORBIDDEN.into_response());
        }
        Resolved::NotFound => {
            tracing::debug!(path, "[stream] not found");
            return Ok(StatusCode::NOT_FOUND.into_response());
        }
    };

    let mut file = File::open(&file_path).await?;
    let size = file.metadata().await?.len();

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let spec = parse_range(range_header, size);
    if spec == RangeSpec::Malformed {
        tracing::debug!(path, range = ?range_header, "[stream] ignoring malformed range");
    }

    let content_type = HeaderValue::from_static(content_type_for(path));
    let builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes");

    let (builder, start, length) = match spec {
        RangeSpec::Full | RangeSpec::Malformed => (builder.status(StatusCode::OK), 0, size),
        RangeSpec::Partial { start, end } => (
            builder.status(StatusCode::PARTIAL_CONTENT).header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, end, size),
            ),
            start,
            end - start + 1,
        ),
        RangeSpec::Unsatisfiable => {
            return Ok(build(
                Response::builder()
                    .status(StatusCode::RANGE_NOT_SATISFIABLE)
                    .header(header::CONTENT_RANGE, format!("bytes */{}", size))
                    .header(header::ACCEPT_RANGES, "bytes"),
                Body::empty(),
            ));
        }
    };

    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }
    let stream = ReaderStream::with_capacity(file.take(length), STREAM_CHUNK_SIZE);

    tracing::debug!(path, start, length, size, "[stream] serving");
    Ok(build(
        builder.header(header::CONTENT_LENGTH, length),
        Body::from_stream(stream),
    ))
}

fn build(builder: axum::http::response::Builder, body: Body) -> Response {
    builder.body(body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "[stream] failed to build response");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header_is_full() {
        assert_eq!(parse_range(None, 1000), RangeSpec::Full);
    }

    #[test]
    fn test_open_ended_and_bounded_ranges() {
        assert_eq!(
            parse_range(Some("bytes=0-"), 1000),
            RangeSpec::Partial { start: 0, end: 999 }
        );
        assert_eq!(
            parse_range(Some("bytes=100-199"), 1000),
            RangeSpec::Partial { start: 100, end: 199 }
        );
        assert_eq!(
            parse_range(Some("bytes=-199"), 1000),
            RangeSpec::Partial { start: 0, end: 199 }
        );
    }

    #[test]
    fn test_end_past_size_is_clamped() {
        assert_eq!(
            parse_range(Some("bytes=900-5000"), 1000),
            RangeSpec::Partial { start: 900, end: 999 }
        );
    }

    #[test]
    fn test_only_first_range_is_honoured() {
        assert_eq!(
            parse_range(Some("bytes=10-19, 50-59"), 1000),
            RangeSpec::Partial { start: 10, end: 19 }
        );
    }

    #[test]
    fn test_malformed_headers() {
        for header in [
            "items=0-10",
            "bytes=abc-10",
            "bytes=10-x",
            "bytes=-",
            "bytes=200-100",
            "bytes=",
            "0-10",
        ] {
            assert_eq!(parse_range(Some(header), 1000), RangeSpec::Malformed, "{}", header);
        }
    }

    #[test]
    fn test_start_past_end_of_file() {
        assert_eq!(parse_range(Some("bytes=1000-"), 1000), RangeSpec::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=5000-6000"), 1000), RangeSpec::Unsatisfiable);
    }

    #[test]
    fn test_empty_file_is_always_full() {
        assert_eq!(parse_range(Some("bytes=0-"), 0), RangeSpec::Full);
        assert_eq!(parse_range(Some("bytes=10-20"), 0), RangeSpec::Full);
    }

    #[test]
    fn test_traversal_detection() {
        assert!(is_traversal("../etc/passwd"));
        assert!(is_traversal("videos/../../secret"));
        assert!(is_traversal("/etc/passwd"));
        assert!(!is_traversal("videos/match1.mp4"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("videos/Match1.MP4"), "video/mp4");
        assert_eq!(content_type_for("clip.webm"), "video/webm");
        assert_eq!(content_type_for("notes.txt"), "application/octet-stream");
    }
}
