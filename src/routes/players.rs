//! Player endpoints (/players, /players/{id}/mentions)

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::stream::stream_url;
use crate::AppState;
use crate::models::{Player, PlayerMention, VideoStatus, format_offset};
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/players", get(list_players))
        .route("/players/{id}/mentions", get(player_mentions))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MentionTimestamp {
    pub offset_ms: i64,
    pub display: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct VideoMentions {
    pub video_id: i64,
    pub title: String,
    pub stream_url: String,
    pub mentions: Vec<MentionTimestamp>,
}

#[derive(Debug, Serialize)]
struct PlayerMentionsResponse {
    player: Player,
    videos: Vec<VideoMentions>,
}

/// Group offset-ordered rows by video. Videos appear in order of their first
/// mention; each video's timestamps stay in numeric order.
pub fn group_by_video(rows: Vec<PlayerMention>) -> Vec<VideoMentions> {
    let mut videos: Vec<VideoMentions> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.video_id).or_insert_with(|| {
            videos.push(VideoMentions {
                video_id: row.video_id,
                title: row.video_title.clone(),
                stream_url: stream_url(&row.video_file_path),
                mentions: Vec::new(),
            });
            videos.len() - 1
        });
        videos[slot].mentions.push(MentionTimestamp {
            offset_ms: row.offset_ms,
            display: format_offset(row.offset_ms),
        });
    }

    videos
}

/// GET /players - All known players ordered by name
async fn list_players(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Player>>, StatusCode> {
    let players = state
        .store
        .list_players()
        .await
        .log_500("List players error")?;
    Ok(Json(players))
}

/// GET /players/{id}/mentions - Where a player is mentioned across ready videos
async fn player_mentions(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<i64>,
) -> Result<Json<PlayerMentionsResponse>, StatusCode> {
    let player = state
        .store
        .get_player(player_id)
        .await
        .log_500("Get player error")?
        .ok_or(StatusCode::NOT_FOUND)?;

    let rows = state
        .store
        .list_mentions_for_player(player_id, VideoStatus::Ready)
        .await
        .log_500("List player mentions error")?;

    Ok(Json(PlayerMentionsResponse {
        player,
        videos: group_by_video(rows),
    }))
}
