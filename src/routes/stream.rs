//! Media streaming endpoint (/stream/*)

use axum::{
    Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    routing::get,
};
use std::sync::Arc;

use crate::AppState;
use crate::stream::serve_file;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stream/{*path}", get(stream_media))
}

/// GET /stream/{*path} - Serve a file under the media root with Range support
async fn stream_media(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve_file(&state.media_root, &path, &headers).await
}

/// Public URL for a stored file path, relative to the media root.
pub fn stream_url(file_path: &str) -> String {
    format!("/stream/{}", file_path.trim_start_matches('/'))
}
