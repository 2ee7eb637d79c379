//! Inline preview: every artifact on one PNG grid, at most five per row.

use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::debug;

use crate::layout::grid::preview_canvas;
use crate::layout::{compute_geometry, LayoutPolicy};
use crate::report::model::GridImage;
use crate::report::ReportError;

pub const PREVIEW_DPI: f32 = 100.0;
const CELL_PAD_PX: f32 = 4.0;

/// Composes the preview grid and encodes it as PNG. Cells past the last image
/// stay white. CPU-bound; call from a blocking task.
pub fn render_preview(images: &[GridImage]) -> Result<Vec<u8>, ReportError> {
    let geometry = compute_geometry(images.len(), LayoutPolicy::Preview);
    let canvas = preview_canvas(geometry);
    let width = (canvas.width_in * PREVIEW_DPI).round() as u32;
    let height = (canvas.height_in * PREVIEW_DPI).round() as u32;
    let cell_w = canvas.cell_width_in * PREVIEW_DPI;
    let cell_h = canvas.cell_height_in * PREVIEW_DPI;
    // Padding never takes more than half of a cell, even when the A4 cap
    // squeezes rows down to a few pixels.
    let pad = CELL_PAD_PX.min(cell_w / 4.0).min(cell_h / 4.0);

    let mut pixmap = Pixmap::new(width, height).ok_or(ReportError::Canvas { width, height })?;
    pixmap.fill(Color::WHITE);

    let mut paint = PixmapPaint::default();
    paint.quality = FilterQuality::Bilinear;

    for (i, image) in images.iter().enumerate() {
        let Some(src) = image.raster.to_pixmap() else {
            continue;
        };
        let (row, col) = geometry.cell(i);
        let box_w = cell_w - 2.0 * pad;
        let box_h = cell_h - 2.0 * pad;
        let scale = (box_w / src.width() as f32).min(box_h / src.height() as f32);
        let x = col as f32 * cell_w + (cell_w - src.width() as f32 * scale) / 2.0;
        let y = row as f32 * cell_h + (cell_h - src.height() as f32 * scale) / 2.0;
        pixmap.draw_pixmap(
            0,
            0,
            src.as_ref(),
            &paint,
            Transform::from_scale(scale, scale).post_translate(x, y),
            None,
        );
    }

    debug!(
        "Preview grid {}x{} for {} images, {} blank cells ({width}x{height}px)",
        geometry.rows,
        geometry.cols,
        images.len(),
        geometry.blank_slots(images.len()).len()
    );

    pixmap
        .encode_png()
        .map_err(|e| ReportError::Png(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::select;
    use crate::raster::tests::png_bytes;
    use crate::raster::DecodedRaster;
    use crate::storage::ObjectSummary;
    use chrono::NaiveDate;

    fn images(n: u32) -> Vec<GridImage> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let listing: Vec<ObjectSummary> = (0..n)
            .map(|d| ObjectSummary {
                key: format!(
                    "7_Field/{}_EVI.png",
                    start + chrono::Days::new(u64::from(d))
                ),
                last_modified: None,
            })
            .collect();
        select(&listing, 7, "EVI")
            .as_slice()
            .iter()
            .map(|artifact| GridImage {
                artifact: artifact.clone(),
                raster: DecodedRaster::decode(&artifact.key, &png_bytes(8, 6, [0, 128, 0, 255]))
                    .unwrap(),
            })
            .collect()
    }

    fn pixel(png: &[u8], x: u32, y: u32) -> [u8; 4] {
        image::load_from_memory(png).unwrap().to_rgba8().get_pixel(x, y).0
    }

    #[test]
    fn test_seven_images_make_two_rows_with_blank_tail() {
        let png = render_preview(&images(7)).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (827, 500));

        let cell_w = 827.0 / 5.0;
        let centre = |col: u32, row: u32| {
            (
                ((col as f32 + 0.5) * cell_w) as u32,
                ((row as f32 + 0.5) * 250.0) as u32,
            )
        };
        let (x, y) = centre(0, 0);
        assert_eq!(pixel(&png, x, y), [0, 128, 0, 255]);
        let (x, y) = centre(1, 1);
        assert_eq!(pixel(&png, x, y), [0, 128, 0, 255]);
        for col in 2..5 {
            let (x, y) = centre(col, 1);
            assert_eq!(pixel(&png, x, y), [255, 255, 255, 255], "slot col {col}");
        }
    }

    #[test]
    fn test_single_image_is_one_cell_wide() {
        let png = render_preview(&images(1)).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (165, 250));
    }

    #[test]
    fn test_tall_preview_is_capped_at_a4() {
        let png = render_preview(&images(30)).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.height(), 1169);
    }

    #[test]
    fn test_many_rows_still_draw_every_image() {
        let n = 800;
        let png = render_preview(&images(n)).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.height(), 1169);

        let rows = (n as usize).div_ceil(5);
        let cell_w = 827.0 / 5.0;
        let cell_h = 1169.0 / rows as f32;
        for slot in 0..n as usize {
            let (row, col) = (slot / 5, slot % 5);
            let x = ((col as f32 + 0.5) * cell_w) as u32;
            let y = ((row as f32 + 0.5) * cell_h) as u32;
            let [r, g, b, _] = decoded.get_pixel(x, y).0;
            assert!(g > 100 && r < 60 && b < 60, "slot {slot} at ({x}, {y}) is {r},{g},{b}");
        }
    }
}
