//! In-process [`VideoStore`].
//!
//! Every operation runs under one mutex, which gives the same per-key
//! atomicity the Postgres backend gets from its unique index and transactions.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::models::{Mention, NewMention, NewVideo, Player, PlayerMention, Video, VideoStatus};
use crate::store::VideoStore;

#[derive(Default)]
struct Tables {
    videos: BTreeMap<i64, Video>,
    players: BTreeMap<i64, Player>,
    mentions: Vec<Mention>,
    next_video_id: i64,
    next_player_id: i64,
    next_mention_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a half-applied write:
        // every mutation validates before touching the tables.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove a video and, as with the cascading foreign key, its mentions.
    pub fn delete_video(&self, video_id: i64) -> bool {
        let mut tables = self.lock();
        tables.mentions.retain(|m| m.video_id != video_id);
        tables.videos.remove(&video_id).is_some()
    }

    /// Remove a player and, as with the cascading foreign key, its mentions.
    pub fn delete_player(&self, player_id: i64) -> bool {
        let mut tables = self.lock();
        tables.mentions.retain(|m| m.player_id != player_id);
        tables.players.remove(&player_id).is_some()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn create_video(&self, video: NewVideo) -> Result<Video, StoreError> {
        let mut tables = self.lock();
        tables.next_video_id += 1;
        let stored = Video {
            id: tables.next_video_id,
            title: video.title,
            file_path: video.file_path,
            uploaded_at: Utc::now(),
            status: video.status,
            failure_reason: None,
        };
        tables.videos.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_video(&self, video_id: i64) -> Result<Option<Video>, StoreError> {
        Ok(self.lock().videos.get(&video_id).cloned())
    }

    async fn set_status(
        &self,
        video_id: i64,
        status: VideoStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let video = tables
            .videos
            .get_mut(&video_id)
            .ok_or(StoreError::VideoNotFound(video_id))?;
        video.status = status;
        video.failure_reason = if status == VideoStatus::Failed {
            failure_reason.map(str::to_string)
        } else {
            None
        };
        Ok(())
    }

    async fn get_or_create_player(&self, name: &str) -> Result<Player, StoreError> {
        let mut tables = self.lock();
        let key = name.to_lowercase();
        if let Some(existing) = tables.players.values().find(|p| p.name.to_lowercase() == key) {
            return Ok(existing.clone());
        }
        tables.next_player_id += 1;
        let player = Player {
            id: tables.next_player_id,
            name: name.to_string(),
        };
        tables.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn get_player(&self, player_id: i64) -> Result<Option<Player>, StoreError> {
        Ok(self.lock().players.get(&player_id).cloned())
    }

    async fn list_players(&self) -> Result<Vec<Player>, StoreError> {
        let mut players: Vec<Player> = self.lock().players.values().cloned().collect();
        players.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(players)
    }

    async fn insert_mentions(&self, mentions: &[NewMention]) -> Result<u64, StoreError> {
        let mut tables = self.lock();

        for mention in mentions {
            if !tables.videos.contains_key(&mention.video_id) {
                return Err(StoreError::VideoNotFound(mention.video_id));
            }
            if !tables.players.contains_key(&mention.player_id) {
                return Err(StoreError::PlayerNotFound(mention.player_id));
            }
            if mention.offset_ms < 0 {
                return Err(StoreError::Invalid(format!(
                    "negative mention offset {}",
                    mention.offset_ms
                )));
            }
        }

        for mention in mentions {
            tables.next_mention_id += 1;
            let id = tables.next_mention_id;
            tables.mentions.push(Mention {
                id,
                video_id: mention.video_id,
                player_id: mention.player_id,
                offset_ms: mention.offset_ms,
            });
        }

        Ok(mentions.len() as u64)
    }

    async fn list_videos_by_status(&self, status: VideoStatus) -> Result<Vec<Video>, StoreError> {
        let mut videos: Vec<Video> = self
            .lock()
            .videos
            .values()
            .filter(|v| v.status == status)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        Ok(videos)
    }

    async fn list_mentions_for_player(
        &self,
        player_id: i64,
        video_status: VideoStatus,
    ) -> Result<Vec<PlayerMention>, StoreError> {
        let tables = self.lock();
        let mut rows: Vec<(i64, PlayerMention)> = tables
            .mentions
            .iter()
            .filter(|m| m.player_id == player_id)
            .filter_map(|m| {
                let video = tables.videos.get(&m.video_id)?;
                (video.status == video_status).then(|| {
                    (
                        m.id,
                        PlayerMention {
                            video_id: video.id,
                            video_title: video.title.clone(),
                            video_file_path: video.file_path.clone(),
                            offset_ms: m.offset_ms,
                        },
                    )
                })
            })
            .collect();
        rows.sort_by(|(a_id, a), (b_id, b)| {
            a.offset_ms
                .cmp(&b.offset_ms)
                .then(a.video_id.cmp(&b.video_id))
                .then(a_id.cmp(b_id))
        });
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn list_mentions_for_video(&self, video_id: i64) -> Result<Vec<Mention>, StoreError> {
        let mut mentions: Vec<Mention> = self
            .lock()
            .mentions
            .iter()
            .filter(|m| m.video_id == video_id)
            .cloned()
            .collect();
        mentions.sort_by(|a, b| a.offset_ms.cmp(&b.offset_ms).then(a.id.cmp(&b.id)));
        Ok(mentions)
    }
}
