use std::sync::Arc;

use crate::config::Config;
use crate::stats_client::StatsSource;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Colourized index PNGs; generated reports are written here as well.
    pub images: Arc<dyn ObjectStore>,
    /// Per-farm boundary GeoJSON documents.
    pub boundaries: Arc<dyn ObjectStore>,
    pub stats: Arc<dyn StatsSource>,
    pub config: Config,
}
