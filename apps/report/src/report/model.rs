//! In-memory report document: an ordered list of pages, built per request.

use chrono::{DateTime, Utc};

use crate::catalog::ImageArtifact;
use crate::layout::GridGeometry;
use crate::raster::DecodedRaster;
use crate::report::chart::ChartLayout;

/// Metadata of the farm boundary shown on the cover. Either field may be
/// missing; a malformed area is dropped rather than failing the report.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryMeta {
    pub area_acres: Option<f64>,
    /// Storage last-modified timestamp, verbatim.
    pub date_added: Option<String>,
}

impl BoundaryMeta {
    /// `(parameter, value)` rows for the cover table; missing fields have no row.
    pub fn table_rows(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();
        if let Some(area) = self.area_acres {
            rows.push(("Area".to_string(), format!("{area:.2} acres")));
        }
        if let Some(date_added) = &self.date_added {
            rows.push((
                "Date Added on mobile application".to_string(),
                date_added.clone(),
            ));
        }
        rows
    }
}

/// Document title, shown on the cover and stored as the PDF title.
pub fn report_title(farm_id: i64) -> String {
    format!("Geospatial Report for farmID : {farm_id}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverPage {
    pub farm_id: i64,
    pub generated_at: DateTime<Utc>,
    pub boundary_meta: Option<BoundaryMeta>,
}

impl CoverPage {
    pub fn title(&self) -> String {
        report_title(self.farm_id)
    }

    pub fn generated_line(&self) -> String {
        self.generated_at
            .format("Report Generated at: %Y-%m-%d %H:%M")
            .to_string()
    }

    pub fn table_rows(&self) -> Vec<(String, String)> {
        self.boundary_meta
            .as_ref()
            .map(BoundaryMeta::table_rows)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPage {
    pub chart: ChartLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridImage {
    pub artifact: ImageArtifact,
    pub raster: DecodedRaster,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageGridPage {
    pub images: Vec<GridImage>,
    pub geometry: GridGeometry,
}

#[cfg(test)]
impl ImageGridPage {
    pub fn is_full(&self) -> bool {
        self.images.len() == crate::layout::grid::PRINT_PAGE_SLOTS
    }

    /// Grid cells with no image; rendered blank.
    pub fn blank_slots(&self) -> std::ops::Range<usize> {
        self.geometry.blank_slots(self.images.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Cover(CoverPage),
    TimeSeries(TimeSeriesPage),
    ImageGrid(ImageGridPage),
}

/// Cover, then the chart, then the image grids in date order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    farm_id: i64,
    index: String,
    generated_at: DateTime<Utc>,
    pages: Vec<Page>,
}

impl ReportDocument {
    /// The only constructor, so page order and cardinality hold by construction.
    pub fn new(
        cover: CoverPage,
        time_series: Option<TimeSeriesPage>,
        grids: Vec<ImageGridPage>,
        index: String,
    ) -> Self {
        let farm_id = cover.farm_id;
        let generated_at = cover.generated_at;
        let mut pages = Vec::with_capacity(2 + grids.len());
        pages.push(Page::Cover(cover));
        pages.extend(time_series.map(Page::TimeSeries));
        pages.extend(grids.into_iter().map(Page::ImageGrid));
        Self {
            farm_id,
            index,
            generated_at,
            pages,
        }
    }

    pub fn farm_id(&self) -> i64 {
        self.farm_id
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[cfg(test)]
    pub fn image_grid_pages(&self) -> impl Iterator<Item = &ImageGridPage> {
        self.pages.iter().filter_map(|p| match p {
            Page::ImageGrid(grid) => Some(grid),
            _ => None,
        })
    }
}
