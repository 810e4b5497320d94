use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::constants::MENTION_INSERT_CHUNK;
use crate::domain::{mentions, players, videos};
use crate::error::StoreError;
use crate::models::{Mention, NewMention, NewVideo, Player, PlayerMention, Video, VideoStatus};
use crate::store::VideoStore;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VideoStore for PgStore {
    async fn create_video(&self, video: NewVideo) -> Result<Video, StoreError> {
        videos::insert_video(&self.pool, &video.title, &video.file_path, video.status)
            .await?
            .try_into()
    }

    async fn get_video(&self, video_id: i64) -> Result<Option<Video>, StoreError> {
        videos::get_video(&self.pool, video_id)
            .await?
            .map(Video::try_from)
            .transpose()
    }

    async fn set_status(
        &self,
        video_id: i64,
        status: VideoStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), StoreError> {
        if videos::update_status(&self.pool, video_id, status, failure_reason).await? {
            Ok(())
        } else {
            Err(StoreError::VideoNotFound(video_id))
        }
    }

    async fn get_or_create_player(&self, name: &str) -> Result<Player, StoreError> {
        Ok(players::get_or_create(&self.pool, name).await?)
    }

    async fn get_player(&self, player_id: i64) -> Result<Option<Player>, StoreError> {
        Ok(players::get_player(&self.pool, player_id).await?)
    }

    async fn list_players(&self) -> Result<Vec<Player>, StoreError> {
        Ok(players::list_players(&self.pool).await?)
    }

    async fn insert_mentions(&self, mentions: &[NewMention]) -> Result<u64, StoreError> {
        if mentions.is_empty() {
            return Ok(0);
        }

        // Chunks share one transaction so readers never see a partial set
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in mentions.chunks(MENTION_INSERT_CHUNK) {
            inserted += mentions::insert_batch(&mut *tx, chunk).await?;
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn list_videos_by_status(&self, status: VideoStatus) -> Result<Vec<Video>, StoreError> {
        videos::list_by_status(&self.pool, status)
            .await?
            .into_iter()
            .map(Video::try_from)
            .collect()
    }

    async fn list_mentions_for_player(
        &self,
        player_id: i64,
        video_status: VideoStatus,
    ) -> Result<Vec<PlayerMention>, StoreError> {
        Ok(mentions::list_for_player(&self.pool, player_id, video_status).await?)
    }

    async fn list_mentions_for_video(&self, video_id: i64) -> Result<Vec<Mention>, StoreError> {
        Ok(mentions::list_for_video(&self.pool, video_id).await?)
    }
}
