use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use video_mentions::AppState;
use video_mentions::config::Config;
use video_mentions::jobs::{self, JobSubmitter, LocalQueue, QueueSubmitter};
use video_mentions::media::{Ffmpeg, MediaTools};
use video_mentions::pipeline::Pipeline;
use video_mentions::routes;
use video_mentions::store::{MemoryStore, PgStore, VideoStore};
use video_mentions::transcribe::{SpeechRecognizer, WhisperConfig, WhisperRecognizer, whisper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("Failed to create media root {}", config.media_root.display()))?;

    if !whisper::is_available() {
        anyhow::bail!(
            "speech recognition is not compiled in; rebuild with the `whisper` feature"
        );
    }

    // Model is loaded once and shared by every job
    let recognizer = WhisperRecognizer::new(WhisperConfig {
        model_path: config.model_path.clone(),
    })
    .context("Failed to load transcription model")?;
    tracing::info!(model = %recognizer.model_name(), "[startup] transcription model loaded");
    let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(recognizer);

    let tools: Arc<dyn MediaTools> = Arc::new(Ffmpeg::new(&config.ffmpeg_bin, &config.ffprobe_bin));

    let (store, submitter): (Arc<dyn VideoStore>, Arc<dyn JobSubmitter>) =
        match &config.database_url {
            Some(database_url) => {
                let pg = PgStore::connect(database_url, config.db_max_connections)
                    .await
                    .context("Failed to connect to database")?;
                pg.migrate().await.context("Failed to run migrations")?;
                jobs::setup_queue(pg.pool())
                    .await
                    .context("Failed to set up job queue")?;

                let pool = pg.pool().clone();
                let store: Arc<dyn VideoStore> = Arc::new(pg);
                let pipeline = Pipeline::from_config(&config, store.clone(), tools, recognizer);
                tokio::spawn(jobs::run_pipeline_worker(
                    pool.clone(),
                    pipeline,
                    config.pipeline_concurrency,
                ));

                (store, Arc::new(QueueSubmitter::new(pool)))
            }
            None => {
                tracing::warn!("[startup] DATABASE_URL not set, using in-memory store and local queue");
                let store: Arc<dyn VideoStore> = Arc::new(MemoryStore::new());
                let pipeline = Pipeline::from_config(&config, store.clone(), tools, recognizer);
                let (queue, _worker) = LocalQueue::start(pipeline, config.pipeline_concurrency);
                (store, Arc::new(queue))
            }
        };

    let state = Arc::new(AppState {
        store,
        jobs: submitter,
        media_root: config.media_root.clone(),
    });
    let app = routes::build_app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        addr = %addr,
        media_root = %config.media_root.display(),
        concurrency = config.pipeline_concurrency,
        "[startup] listening"
    );
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
