//! Postgres queries, one module per table.

pub mod mentions;
pub mod players;
pub mod videos;
