//! Video domain - DB queries for uploaded videos
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for transactions).

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use crate::error::StoreError;
use crate::models::{Video, VideoStatus};

#[derive(Debug, sqlx::FromRow)]
pub struct VideoRow {
    pub id: i64,
    pub title: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: String,
    pub failure_reason: Option<String>,
}

impl TryFrom<VideoRow> for Video {
    type Error = StoreError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        Ok(Video {
            id: row.id,
            title: row.title,
            file_path: row.file_path,
            uploaded_at: row.uploaded_at,
            status: row.status.parse().map_err(StoreError::Invalid)?,
            failure_reason: row.failure_reason,
        })
    }
}

/// Insert a video and return the stored row
pub async fn insert_video<'e, E>(
    executor: E,
    title: &str,
    file_path: &str,
    status: VideoStatus,
) -> Result<VideoRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO videos (title, file_path, status)
        VALUES ($1, $2, $3)
        RETURNING id, title, file_path, uploaded_at, status, failure_reason
        "#,
    )
    .bind(title)
    .bind(file_path)
    .bind(status.as_str())
    .fetch_one(executor)
    .await
}

pub async fn get_video<'e, E>(executor: E, video_id: i64) -> Result<Option<VideoRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, title, file_path, uploaded_at, status, failure_reason
        FROM videos
        WHERE id = $1
        "#,
    )
    .bind(video_id)
    .fetch_optional(executor)
    .await
}

/// Set a video's status. The failure reason is only kept for `failed`.
/// Returns false if the video does not exist.
pub async fn update_status<'e, E>(
    executor: E,
    video_id: i64,
    status: VideoStatus,
    failure_reason: Option<&str>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let reason = if status == VideoStatus::Failed {
        failure_reason
    } else {
        None
    };

    let result = sqlx::query(
        r#"
        UPDATE videos
        SET status = $1, failure_reason = $2
        WHERE id = $3
        "#,
    )
    .bind(status.as_str())
    .bind(reason)
    .bind(video_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// List videos in a given status, newest upload first
pub async fn list_by_status<'e, E>(
    executor: E,
    status: VideoStatus,
) -> Result<Vec<VideoRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, title, file_path, uploaded_at, status, failure_reason
        FROM videos
        WHERE status = $1
        ORDER BY uploaded_at DESC, id DESC
        "#,
    )
    .bind(status.as_str())
    .fetch_all(executor)
    .await
}
