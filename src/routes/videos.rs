//! Video endpoints (/videos, /videos/{id})

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State, multipart::Field},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

use super::stream::stream_url;
use crate::AppState;
use crate::constants::UPLOAD_DIR;
use crate::models::{NewVideo, Video, VideoStatus};
use crate::services::error::LogErr;

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/videos", get(list_videos).post(upload_video))
        .route("/videos/{id}", get(get_video))
}

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub id: i64,
    pub title: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: VideoStatus,
    pub failure_reason: Option<String>,
    pub stream_url: String,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            stream_url: stream_url(&video.file_path),
            id: video.id,
            title: video.title,
            file_path: video.file_path,
            uploaded_at: video.uploaded_at,
            status: video.status,
            failure_reason: video.failure_reason,
        }
    }
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    id: i64,
    status: VideoStatus,
}

fn get_extension(content_type: &str, file_name: Option<&str>) -> String {
    let known = match content_type {
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/quicktime" => Some("mov"),
        "video/x-matroska" => Some("mkv"),
        "video/x-msvideo" => Some("avi"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    file_name
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

/// Stream one `file` field to disk under the media root. Returns the path
/// relative to the media root.
async fn save_video_field(media_root: &FsPath, mut field: Field<'_>) -> Result<String, StatusCode> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    if !content_type.starts_with("video/") {
        tracing::warn!(content_type = %content_type, "[upload] rejected non-video file");
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    let ext = get_extension(&content_type, field.file_name());
    let relative_path = format!(
        "{}/{}-{}.{}",
        UPLOAD_DIR,
        Utc::now().format("%Y%m%d%H%M%S%3f"),
        UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed),
        ext
    );
    let full_path = media_root.join(&relative_path);
    if let Some(parent) = full_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .log_500("Create upload directory error")?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&full_path)
        .await
        .log_500("Create upload file error")?;

    let written = async {
        let mut total = 0usize;
        while let Some(chunk) = field
            .chunk()
            .await
            .log_status("Upload body error", StatusCode::BAD_REQUEST)?
        {
            file.write_all(&chunk).await.log_500("Write upload error")?;
            total += chunk.len();
        }
        file.flush().await.log_500("Flush upload error")?;
        Ok::<_, StatusCode>(total)
    }
    .await;

    match written {
        Ok(bytes) => {
            tracing::info!(path = %relative_path, bytes, "[upload] saved video");
            Ok(relative_path)
        }
        Err(status) => {
            remove_upload(media_root, &relative_path).await;
            Err(status)
        }
    }
}

async fn remove_upload(media_root: &FsPath, relative_path: &str) {
    if let Err(e) = tokio::fs::remove_file(media_root.join(relative_path)).await {
        tracing::warn!(path = %relative_path, error = %e, "[upload] failed to clean up file");
    }
}

struct UploadForm {
    title: String,
    players: String,
    file_path: String,
}

async fn read_upload_form(
    media_root: &FsPath,
    multipart: &mut Multipart,
) -> Result<UploadForm, StatusCode> {
    let mut title: Option<String> = None;
    let mut players: Option<String> = None;
    let mut file_path: Option<String> = None;

    let read = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .log_status("Multipart field error", StatusCode::BAD_REQUEST)?
        {
            let name = field.name().map(|s| s.to_string());
            match name.as_deref() {
                Some("title") => {
                    title = Some(field.text().await.log_status("Title field error", StatusCode::BAD_REQUEST)?)
                }
                Some("players") => {
                    players = Some(field.text().await.log_status("Players field error", StatusCode::BAD_REQUEST)?)
                }
                Some("file") if file_path.is_none() => {
                    file_path = Some(save_video_field(media_root, field).await?);
                }
                _ => {}
            }
        }
        Ok::<_, StatusCode>(())
    }
    .await;

    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    match (read, title, players, file_path) {
        (Ok(()), Some(title), Some(players), Some(file_path)) => Ok(UploadForm {
            title,
            players,
            file_path,
        }),
        (read, _, _, file_path) => {
            if let Some(path) = file_path {
                remove_upload(media_root, &path).await;
            }
            read?;
            tracing::warn!("[upload] missing title, players or file field");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// POST /videos - Upload a video and queue it for indexing
///
/// Multipart fields:
/// - `title`: display title
/// - `players`: comma-separated player names to look for
/// - `file`: the video itself (`video/*`)
async fn upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), StatusCode> {
    let form = read_upload_form(&state.media_root, &mut multipart).await?;

    let video = match state
        .store
        .create_video(NewVideo {
            title: form.title,
            file_path: form.file_path.clone(),
            status: VideoStatus::Processing,
        })
        .await
    {
        Ok(video) => video,
        Err(e) => {
            tracing::error!(error = %e, "[upload] create video error");
            remove_upload(&state.media_root, &form.file_path).await;
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if let Err(e) = state.jobs.submit(video.id, &form.players).await {
        tracing::error!(video_id = video.id, error = %e, "[upload] job submission failed");
        let reason = format!("job submission failed: {}", e);
        state
            .store
            .set_status(video.id, VideoStatus::Failed, Some(&reason))
            .await
            .log_500("Mark video failed error")?;
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            id: video.id,
            status: video.status,
        }),
    ))
}

/// GET /videos/{id} - Status and metadata for one video
async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
) -> Result<Json<VideoResponse>, StatusCode> {
    let video = state
        .store
        .get_video(video_id)
        .await
        .log_500("Get video error")?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(video.into()))
}

#[derive(Debug, Deserialize)]
struct ListVideosQuery {
    status: Option<String>,
}

/// GET /videos?status= - Videos with the given status (default `ready`), newest first
async fn list_videos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListVideosQuery>,
) -> Result<Json<Vec<VideoResponse>>, StatusCode> {
    let status = match query.status.as_deref() {
        None | Some("") => VideoStatus::Ready,
        Some(s) => s
            .parse::<VideoStatus>()
            .log_status("Invalid status filter", StatusCode::BAD_REQUEST)?,
    };

    let videos = state
        .store
        .list_videos_by_status(status)
        .await
        .log_500("List videos error")?;

    Ok(Json(videos.into_iter().map(VideoResponse::from).collect()))
}
