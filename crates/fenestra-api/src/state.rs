use crate::services::ingest::IngestService;
use fenestra_core::Config;
use fenestra_db::ImageRepository;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub images: Arc<dyn ImageRepository>,
    pub ingest: IngestService,
}
