//! Grid geometry for the two report layouts.
//!
//! - Preview: one inline PNG, at most 5 columns, as many rows as needed.
//! - Print page: one PDF page per chunk of at most 4 images, shape taken from a
//!   fixed table keyed by chunk size.

use std::ops::Range;

use serde::Serialize;

use crate::layout::font_metrics::{A4_HEIGHT_IN, A4_WIDTH_IN};

pub const PREVIEW_MAX_COLS: usize = 5;
pub const PRINT_PAGE_SLOTS: usize = 4;

/// Height of one preview cell in inches; width is a fifth of A4.
pub const PREVIEW_CELL_HEIGHT_IN: f32 = 2.5;
pub const PREVIEW_CELL_WIDTH_IN: f32 = A4_WIDTH_IN / PREVIEW_MAX_COLS as f32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPolicy {
    Preview,
    PrintPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridGeometry {
    pub rows: usize,
    pub cols: usize,
}

impl GridGeometry {
    const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn slots(&self) -> usize {
        self.rows * self.cols
    }

    /// `(row, col)` of slot `i` in row-major order.
    pub fn cell(&self, i: usize) -> (usize, usize) {
        (i / self.cols, i % self.cols)
    }

    /// Slots left empty when `filled` images are placed row-major. Always the
    /// trailing slots of the last row.
    pub fn blank_slots(&self, filled: usize) -> Range<usize> {
        filled.min(self.slots())..self.slots()
    }
}

/// Print-page shapes for 1, 2, 3 and 4 images.
const PRINT_PAGE_TABLE: [GridGeometry; PRINT_PAGE_SLOTS] = [
    GridGeometry::new(1, 1),
    GridGeometry::new(1, 2),
    GridGeometry::new(2, 2),
    GridGeometry::new(2, 2),
];

/// Grid shape for `image_count` images under `policy`.
///
/// Total for every input: zero images yields 1×1, and print-page counts above
/// the slot cap are clamped to a full page.
pub fn compute_geometry(image_count: usize, policy: LayoutPolicy) -> GridGeometry {
    match policy {
        LayoutPolicy::Preview => {
            let n = image_count.max(1);
            GridGeometry::new(n.div_ceil(PREVIEW_MAX_COLS), n.min(PREVIEW_MAX_COLS))
        }
        LayoutPolicy::PrintPage => {
            let n = image_count.clamp(1, PRINT_PAGE_SLOTS);
            PRINT_PAGE_TABLE[n - 1]
        }
    }
}

/// Splits `items` into print pages of at most `PRINT_PAGE_SLOTS`, preserving order.
pub fn print_chunks<T>(items: &[T]) -> std::slice::Chunks<'_, T> {
    items.chunks(PRINT_PAGE_SLOTS)
}

/// Canvas size of a preview grid, in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewCanvas {
    pub width_in: f32,
    pub height_in: f32,
    pub cell_width_in: f32,
    pub cell_height_in: f32,
}

/// Width grows with the column count; height is capped at one A4 page, in which
/// case the rows share the capped height evenly.
pub fn preview_canvas(geometry: GridGeometry) -> PreviewCanvas {
    let width_in = geometry.cols as f32 * PREVIEW_CELL_WIDTH_IN;
    let height_in = (geometry.rows as f32 * PREVIEW_CELL_HEIGHT_IN).min(A4_HEIGHT_IN);
    PreviewCanvas {
        width_in,
        height_in,
        cell_width_in: PREVIEW_CELL_WIDTH_IN,
        cell_height_in: height_in / geometry.rows as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_geometry_covers_all_images() {
        for n in 0..=40 {
            let g = compute_geometry(n, LayoutPolicy::Preview);
            assert!(g.rows >= 1 && g.cols >= 1);
            assert!(g.slots() >= n, "n={n} geometry={g:?}");
            assert!(g.cols <= PREVIEW_MAX_COLS);
            // No fully empty row.
            assert!(g.slots() - n.max(1) < g.cols, "n={n} geometry={g:?}");
        }
    }

    #[test]
    fn test_preview_blank_slots_are_trailing_on_last_row() {
        for n in 1..=23 {
            let g = compute_geometry(n, LayoutPolicy::Preview);
            for slot in g.blank_slots(n) {
                assert_eq!(g.cell(slot).0, g.rows - 1, "n={n} slot={slot}");
            }
        }
        let g = compute_geometry(7, LayoutPolicy::Preview);
        assert_eq!(g, GridGeometry { rows: 2, cols: 5 });
        assert_eq!(g.blank_slots(7), 7..10);
    }

    #[test]
    fn test_preview_exact_multiple_has_no_blanks() {
        let g = compute_geometry(10, LayoutPolicy::Preview);
        assert_eq!(g, GridGeometry { rows: 2, cols: 5 });
        assert!(g.blank_slots(10).is_empty());
    }

    #[test]
    fn test_print_page_table() {
        let shapes: Vec<(usize, usize)> = (1..=4)
            .map(|n| compute_geometry(n, LayoutPolicy::PrintPage))
            .map(|g| (g.rows, g.cols))
            .collect();
        assert_eq!(shapes, vec![(1, 1), (1, 2), (2, 2), (2, 2)]);
        assert_eq!(
            compute_geometry(3, LayoutPolicy::PrintPage).blank_slots(3),
            3..4
        );
    }

    #[test]
    fn test_zero_images_does_not_panic() {
        assert_eq!(
            compute_geometry(0, LayoutPolicy::Preview),
            GridGeometry { rows: 1, cols: 1 }
        );
        assert_eq!(
            compute_geometry(0, LayoutPolicy::PrintPage),
            GridGeometry { rows: 1, cols: 1 }
        );
    }

    #[test]
    fn test_print_chunks_count_and_sizes() {
        for n in 0..=17usize {
            let items: Vec<usize> = (0..n).collect();
            let chunks: Vec<&[usize]> = print_chunks(&items).collect();
            assert_eq!(chunks.len(), n.div_ceil(PRINT_PAGE_SLOTS));
            if let Some((last, full)) = chunks.split_last() {
                assert!(full.iter().all(|c| c.len() == PRINT_PAGE_SLOTS));
                assert!(!last.is_empty() && last.len() <= PRINT_PAGE_SLOTS);
            }
            let flattened: Vec<usize> = chunks.concat();
            assert_eq!(flattened, items);
        }
    }

    #[test]
    fn test_preview_canvas_caps_height_at_a4() {
        let small = preview_canvas(compute_geometry(3, LayoutPolicy::Preview));
        assert!((small.width_in - 3.0 * PREVIEW_CELL_WIDTH_IN).abs() < 1e-4);
        assert!((small.height_in - PREVIEW_CELL_HEIGHT_IN).abs() < 1e-4);

        let tall = preview_canvas(compute_geometry(30, LayoutPolicy::Preview));
        assert!((tall.height_in - A4_HEIGHT_IN).abs() < 1e-4);
        assert!((tall.cell_height_in * 6.0 - A4_HEIGHT_IN).abs() < 1e-3);
    }
}
