// Report layout: page dimensions, text metrics and grid geometry.
// Everything here is pure; rendering lives in `report::pdf` and `report::preview`.

pub mod font_metrics;
pub mod grid;

pub use grid::{compute_geometry, GridGeometry, LayoutPolicy};
