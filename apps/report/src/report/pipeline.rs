//! Request pipelines behind the two endpoints.
//!
//! Each runs as one sequential chain of storage and HTTP calls; decoding and
//! rendering are pushed onto the blocking pool.

use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use crate::catalog::{list_artifacts, ArtifactSet};
use crate::errors::AppError;
use crate::raster::DecodedRaster;
use crate::report::assembler::{assemble, AssemblyInput};
use crate::report::cover::load_boundary_meta;
use crate::report::model::GridImage;
use crate::report::preview::render_preview;
use crate::report::sink::{DocumentSink, RetrievalHandle};
use crate::state::AppState;
use crate::storage::{ObjectStore, StorageError};

const NO_RESULTS_MESSAGE: &str = "No PNG images found";

/// A rendered preview plus the text the raster itself does not carry.
#[derive(Debug, Clone)]
pub struct Preview {
    pub png: Vec<u8>,
    pub title: String,
    pub dates: Vec<String>,
}

/// Builds the inline preview grid for `(farm_id, index)`.
pub async fn compose_preview(
    state: &AppState,
    farm_id: i64,
    index: &str,
) -> Result<Preview, AppError> {
    let artifacts = select_nonempty(state, farm_id, index).await?;
    let payloads = fetch_payloads(state.images.as_ref(), &artifacts).await?;

    let title = format!(
        "Temporal {} for {}",
        artifacts.index(),
        artifacts
            .farm_display_name()
            .unwrap_or_else(|| farm_id.to_string())
    );
    let dates = artifacts
        .as_slice()
        .iter()
        .map(|a| a.date_label().to_string())
        .collect();

    let png = tokio::task::spawn_blocking(move || {
        let images = artifacts
            .as_slice()
            .iter()
            .zip(payloads.iter())
            .map(|(artifact, bytes)| -> Result<GridImage, AppError> {
                Ok(GridImage {
                    artifact: artifact.clone(),
                    raster: DecodedRaster::decode(&artifact.key, bytes)
                        .map_err(|e| AppError::Render(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        render_preview(&images).map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("preview task failed: {e}")))??;

    info!("Rendered preview for farm {farm_id} ({} bytes)", png.len());
    Ok(Preview { png, title, dates })
}

/// Composes, stores and signs the full PDF report for `(farm_id, index)`.
///
/// Statistics are all-or-nothing: any upstream failure aborts before anything
/// is written.
pub async fn compose_report(
    state: &AppState,
    farm_id: i64,
    index: &str,
) -> Result<RetrievalHandle, AppError> {
    let artifacts = select_nonempty(state, farm_id, index).await?;

    let boundary_meta = load_boundary_meta(state.boundaries.as_ref(), farm_id).await?;
    info!(
        "Boundary metadata for farm {farm_id}: {}",
        if boundary_meta.is_some() { "found" } else { "absent" }
    );

    let series = state.stats.fetch(farm_id, index).await?;
    info!("Fetched {} temporal points for farm {farm_id}", series.len());

    let payloads = fetch_payloads(state.images.as_ref(), &artifacts).await?;
    let generated_at = Utc::now();

    let report = tokio::task::spawn_blocking(move || {
        assemble(AssemblyInput {
            artifacts: &artifacts,
            payloads,
            boundary_meta,
            series: &series,
            generated_at,
        })
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("assembly task failed: {e}")))??;

    DocumentSink::new(state.images.clone(), state.config.report_link_ttl())
        .persist(report)
        .await
}

async fn select_nonempty(
    state: &AppState,
    farm_id: i64,
    index: &str,
) -> Result<ArtifactSet, AppError> {
    let artifacts = list_artifacts(state.images.as_ref(), farm_id, index).await?;
    if artifacts.is_empty() {
        info!("No artifacts for farm {farm_id} / {}", artifacts.index());
        return Err(AppError::NoResults(NO_RESULTS_MESSAGE.to_string()));
    }
    info!(
        "Selected {} artifacts for farm {farm_id} / {}",
        artifacts.len(),
        artifacts.index()
    );
    Ok(artifacts)
}

/// Fetches payloads one at a time, in artifact order.
async fn fetch_payloads(
    store: &dyn ObjectStore,
    artifacts: &ArtifactSet,
) -> Result<Vec<Bytes>, StorageError> {
    let mut payloads = Vec::with_capacity(artifacts.len());
    for artifact in artifacts.as_slice() {
        payloads.push(store.get(&artifact.key).await?.body);
    }
    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::tests::png_bytes;
    use crate::report::sink::REPORT_PREFIX;
    use crate::state::testing::{state, ScriptedStats};
    use crate::storage::memory::MemoryStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn image_store(days: &[u32]) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        let modified = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        for d in days {
            store.insert(
                &format!("42_Green_Acres/2024-01-{d:02}_NDVI.png"),
                png_bytes(6, 4, [30, 160, 60, 255]),
                modified,
            );
        }
        store.insert(
            "42_Green_Acres/2024-01-01_EVI.png",
            png_bytes(6, 4, [0, 0, 0, 255]),
            modified,
        );
        Arc::new(store)
    }

    fn boundary_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.insert(
            "42_boundary.geojson",
            br#"{"properties": {"area": 18.5}}"#.to_vec(),
            Utc.with_ymd_and_hms(2023, 6, 1, 8, 0, 0).unwrap(),
        );
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_report_is_stored_and_linked() {
        let images = image_store(&[5, 3, 1, 4, 2]);
        let app = state(images.clone(), boundary_store(), ScriptedStats::days(5));

        let handle = compose_report(&app, 42, "ndvi").await.unwrap();
        assert!(handle.key.starts_with("reports/42_"));

        let pdf = images.fetch_url(&handle.url).unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_reports_keep_their_own_documents() {
        let images = image_store(&[1, 2, 3, 4, 5]);
        let app = state(images.clone(), boundary_store(), ScriptedStats::days(5));

        let (ndvi, evi) = tokio::join!(
            compose_report(&app, 42, "NDVI"),
            compose_report(&app, 42, "EVI")
        );
        let (ndvi, evi) = (ndvi.unwrap(), evi.unwrap());
        assert_ne!(ndvi.key, evi.key);
        assert!(ndvi.key.starts_with("reports/42_NDVI_"));
        assert!(evi.key.starts_with("reports/42_EVI_"));

        let pages = |url: &str| {
            let pdf = images.fetch_url(url).unwrap();
            lopdf::Document::load_mem(&pdf).unwrap().get_pages().len()
        };
        // Cover + chart + grids: five NDVI images need two grid pages, one EVI image needs one.
        assert_eq!(pages(&ndvi.url), 4);
        assert_eq!(pages(&evi.url), 3);
    }

    #[tokio::test]
    async fn test_empty_selection_is_no_results() {
        let app = state(image_store(&[]), boundary_store(), ScriptedStats::days(1));
        let err = compose_report(&app, 42, "SAVI").await.unwrap_err();
        match err {
            AppError::NoResults(msg) => assert_eq!(msg, "No PNG images found"),
            other => panic!("expected NoResults, got {other:?}"),
        }
        let err = compose_preview(&app, 7, "NDVI").await.unwrap_err();
        assert!(matches!(err, AppError::NoResults(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_aborts_without_writing() {
        let images = image_store(&[1, 2]);
        let app = state(images.clone(), boundary_store(), ScriptedStats::failing(503));

        let err = compose_report(&app, 42, "NDVI").await.unwrap_err();
        match err {
            AppError::Upstream { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert!(images.keys().iter().all(|k| !k.starts_with(REPORT_PREFIX)));
    }

    #[tokio::test]
    async fn test_report_without_boundary_or_stats() {
        let images = image_store(&[1]);
        let app = state(
            images.clone(),
            Arc::new(MemoryStore::new()),
            ScriptedStats::days(0),
        );
        let handle = compose_report(&app, 42, "NDVI").await.unwrap();
        let pdf = images.fetch_url(&handle.url).unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[tokio::test]
    async fn test_preview_title_and_dates() {
        let app = state(
            image_store(&[3, 1, 2]),
            boundary_store(),
            ScriptedStats::days(3),
        );
        let preview = compose_preview(&app, 42, "ndvi").await.unwrap();
        assert_eq!(preview.title, "Temporal NDVI for Green Acres");
        assert_eq!(preview.dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert!(preview.png.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
