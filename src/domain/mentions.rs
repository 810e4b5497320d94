//! Mention domain - DB queries for player mentions
//!
//! Mentions are append-only: inserted in bulk by the pipeline, removed only by
//! cascade when their video or player is deleted.

use sqlx::{Executor, Postgres, QueryBuilder};

use crate::models::{Mention, NewMention, PlayerMention, VideoStatus};

/// Insert a batch of mentions in one statement.
///
/// Callers keep batches under the bind limit (see `MENTION_INSERT_CHUNK`) and
/// wrap multiple batches in a transaction.
pub async fn insert_batch<'e, E>(executor: E, mentions: &[NewMention]) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if mentions.is_empty() {
        return Ok(0);
    }

    let mut builder =
        QueryBuilder::<Postgres>::new("INSERT INTO mentions (video_id, player_id, offset_ms) ");
    builder.push_values(mentions, |mut row, mention| {
        row.push_bind(mention.video_id)
            .push_bind(mention.player_id)
            .push_bind(mention.offset_ms);
    });

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

/// Mentions of a player in videos with the given status, ordered by numeric offset
pub async fn list_for_player<'e, E>(
    executor: E,
    player_id: i64,
    video_status: VideoStatus,
) -> Result<Vec<PlayerMention>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT m.video_id, v.title AS video_title, v.file_path AS video_file_path, m.offset_ms
        FROM mentions m
        JOIN videos v ON v.id = m.video_id
        WHERE m.player_id = $1 AND v.status = $2
        ORDER BY m.offset_ms ASC, m.video_id ASC, m.id ASC
        "#,
    )
    .bind(player_id)
    .bind(video_status.as_str())
    .fetch_all(executor)
    .await
}

pub async fn list_for_video<'e, E>(executor: E, video_id: i64) -> Result<Vec<Mention>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, video_id, player_id, offset_ms
        FROM mentions
        WHERE video_id = $1
        ORDER BY offset_ms ASC, id ASC
        "#,
    )
    .bind(video_id)
    .fetch_all(executor)
    .await
}
