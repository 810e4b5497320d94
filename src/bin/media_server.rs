//! Standalone media file server.
//!
//! Serves the media root with byte-range support, independently of the API
//! process, so players can seek through videos without touching the indexer.
//!
//! ## Environment Variables
//! - `MEDIA_ROOT` - directory containing uploaded videos (default: `media`)
//! - `MEDIA_SERVER_PORT` - port to listen on (default: `3001`)

use axum::{
    Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    routing::get,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use video_mentions::config::Config;
use video_mentions::stream::serve_file;

struct MediaState {
    media_root: PathBuf,
}

async fn stream_media(
    State(state): State<Arc<MediaState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve_file(&state.media_root, &path, &headers).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    if !config.media_root.is_dir() {
        tracing::warn!(
            media_root = %config.media_root.display(),
            "[media-server] media root does not exist; every request will 404"
        );
    }

    let state = Arc::new(MediaState {
        media_root: config.media_root.clone(),
    });

    let app = Router::new()
        .route("/stream/{*path}", get(stream_media))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.media_server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, media_root = %config.media_root.display(), "[media-server] listening");

    axum::serve(listener, app).await?;
    Ok(())
}
