//! Player domain - DB queries for players

use sqlx::{Executor, Postgres};

use crate::models::Player;

/// Return the player whose name matches case-insensitively, creating it if absent.
///
/// A single conditional write against the unique `lower(name)` index: two
/// jobs racing on a new name both get the same row. The no-op update makes
/// `RETURNING` yield the existing row on conflict.
pub async fn get_or_create<'e, E>(executor: E, name: &str) -> Result<Player, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO players (name)
        VALUES ($1)
        ON CONFLICT ((lower(name))) DO UPDATE SET name = players.name
        RETURNING id, name
        "#,
    )
    .bind(name)
    .fetch_one(executor)
    .await
}

pub async fn get_player<'e, E>(executor: E, player_id: i64) -> Result<Option<Player>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, name FROM players WHERE id = $1")
        .bind(player_id)
        .fetch_optional(executor)
        .await
}

pub async fn list_players<'e, E>(executor: E) -> Result<Vec<Player>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, name FROM players ORDER BY lower(name), id")
        .fetch_all(executor)
        .await
}
