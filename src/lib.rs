//! Player-mention indexing for uploaded match videos.
//!
//! Uploads are stored under the media root and queued for the [`pipeline`],
//! which extracts audio, transcribes it and records every spoken mention of a
//! requested player. Videos are served back with byte-range support.

pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod jobs;
pub mod matcher;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;
pub mod store;
pub mod stream;
pub mod transcribe;

use std::path::PathBuf;
use std::sync::Arc;

use crate::jobs::JobSubmitter;
use crate::store::VideoStore;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VideoStore>,
    pub jobs: Arc<dyn JobSubmitter>,
    pub media_root: PathBuf,
}
