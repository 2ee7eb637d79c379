// Report composition: artifact grids, temporal chart and cover assembled into a
// multi-page PDF, plus the single-image preview grid.
// Decoding and rendering are CPU-bound and run inside tokio::task::spawn_blocking.

pub mod assembler;
pub mod chart;
pub mod cover;
pub mod handlers;
pub mod model;
pub mod pdf;
pub mod pipeline;
pub mod preview;
pub mod sink;

use thiserror::Error;

use crate::raster::RasterError;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("{got} payloads for {expected} artifacts")]
    PayloadCount { expected: usize, got: usize },

    #[error("PDF serialization failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("preview canvas could not be allocated ({width}x{height})")]
    Canvas { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Png(String),
}
