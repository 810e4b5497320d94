//! Record store for videos, players and mentions.
//!
//! The pipeline and the HTTP layer only see [`VideoStore`]. [`PgStore`] is the
//! production backend; [`MemoryStore`] backs the database-less dev mode and
//! the tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Mention, NewMention, NewVideo, Player, PlayerMention, Video, VideoStatus};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create_video(&self, video: NewVideo) -> Result<Video, StoreError>;

    async fn get_video(&self, video_id: i64) -> Result<Option<Video>, StoreError>;

    /// Fails with [`StoreError::VideoNotFound`] for an unknown id. The reason
    /// is stored only alongside [`VideoStatus::Failed`] and cleared otherwise.
    async fn set_status(
        &self,
        video_id: i64,
        status: VideoStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Atomic insert-if-absent keyed on the lowercased name.
    async fn get_or_create_player(&self, name: &str) -> Result<Player, StoreError>;

    async fn get_player(&self, player_id: i64) -> Result<Option<Player>, StoreError>;

    async fn list_players(&self) -> Result<Vec<Player>, StoreError>;

    /// All-or-nothing: either every mention becomes visible or none does.
    async fn insert_mentions(&self, mentions: &[NewMention]) -> Result<u64, StoreError>;

    async fn list_videos_by_status(&self, status: VideoStatus) -> Result<Vec<Video>, StoreError>;

    /// Ordered by numeric offset, then video.
    async fn list_mentions_for_player(
        &self,
        player_id: i64,
        video_status: VideoStatus,
    ) -> Result<Vec<PlayerMention>, StoreError>;

    async fn list_mentions_for_video(&self, video_id: i64) -> Result<Vec<Mention>, StoreError>;
}
