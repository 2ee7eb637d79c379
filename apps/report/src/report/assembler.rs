//! Report assembly: cover, chart, then the artifacts paginated four to a page.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::catalog::ArtifactSet;
use crate::layout::grid::print_chunks;
use crate::layout::{compute_geometry, LayoutPolicy};
use crate::raster::DecodedRaster;
use crate::report::chart;
use crate::report::model::{BoundaryMeta, CoverPage, GridImage, ImageGridPage, ReportDocument};
use crate::report::ReportError;
use crate::stats_client::TimeSeriesPoint;

/// Everything a report is composed from. `payloads[i]` is the raw raster of
/// `artifacts.as_slice()[i]`.
pub struct AssemblyInput<'a> {
    pub artifacts: &'a ArtifactSet,
    pub payloads: Vec<Bytes>,
    pub boundary_meta: Option<BoundaryMeta>,
    pub series: &'a [TimeSeriesPoint],
    pub generated_at: DateTime<Utc>,
}

/// Composes the full document. CPU-bound (raster decoding); call from a
/// blocking task.
pub fn assemble(input: AssemblyInput<'_>) -> Result<ReportDocument, ReportError> {
    let AssemblyInput {
        artifacts,
        payloads,
        boundary_meta,
        series,
        generated_at,
    } = input;

    if payloads.len() != artifacts.len() {
        return Err(ReportError::PayloadCount {
            expected: artifacts.len(),
            got: payloads.len(),
        });
    }

    let cover = CoverPage {
        farm_id: artifacts.farm_id(),
        generated_at,
        boundary_meta,
    };

    let time_series = chart::build(series);

    let decoded = artifacts
        .as_slice()
        .iter()
        .zip(payloads.iter())
        .map(|(artifact, bytes)| -> Result<GridImage, ReportError> {
            Ok(GridImage {
                artifact: artifact.clone(),
                raster: DecodedRaster::decode(&artifact.key, bytes)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let grids: Vec<ImageGridPage> = print_chunks(&decoded)
        .map(|chunk| ImageGridPage {
            images: chunk.to_vec(),
            geometry: compute_geometry(chunk.len(), LayoutPolicy::PrintPage),
        })
        .collect();

    debug!(
        "Assembled report for farm {}: {} images on {} grid pages",
        artifacts.farm_id(),
        decoded.len(),
        grids.len()
    );

    Ok(ReportDocument::new(
        cover,
        Some(time_series),
        grids,
        artifacts.index().to_string(),
    ))
}
