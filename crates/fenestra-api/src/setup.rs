//! Application wiring: tracing, database pool, storage backend, router and
//! server startup.

use crate::handlers::{health, images, library_images, project_images};
use crate::services::ingest::IngestService;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use fenestra_core::Config;
use fenestra_db::{ImageRepository, PgImageRepository};
use fenestra_processing::{UploadValidator, VariantSpec};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect the database, run migrations, build the storage backend and the
/// router.
pub async fn initialize_app(config: Config) -> anyhow::Result<(Arc<AppState>, Router)> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await?;

    fenestra_db::MIGRATOR.run(&pool).await?;

    let storage = fenestra_storage::create_storage(&config).await?;
    tracing::info!(backend = storage.backend_type().as_str(), "Storage ready");

    tokio::fs::create_dir_all(&config.spool_dir).await?;

    let images: Arc<dyn ImageRepository> = Arc::new(PgImageRepository::new(pool));
    let ingest = IngestService::new(
        storage,
        images.clone(),
        UploadValidator::new(
            config.max_file_size_bytes,
            config.allowed_content_types.clone(),
        ),
        VariantSpec::defaults(),
        PathBuf::from(&config.spool_dir),
    );

    let state = Arc::new(AppState {
        config,
        images,
        ingest,
    });

    let router = build_router(state.clone());
    Ok((state, router))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // Whole-request ceiling: a full batch of maximum-size files plus
    // multipart framing overhead.
    let body_limit = state.config.max_file_size_bytes * (state.config.max_batch_files + 1)
        + 1024 * 1024;

    Router::new()
        .route("/healthz", get(health::healthz))
        .route(
            "/api/projects/{project_id}/images",
            post(project_images::upload_project_images).get(project_images::list_project_images),
        )
        .route("/api/images/{id}", delete(images::delete_image))
        .route(
            "/api/uploads",
            post(library_images::upload_library_images).get(library_images::list_library_images),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: &Config, router: Router) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = %config.environment, "Image service listening");
    axum::serve(listener, router).await?;
    Ok(())
}
