//! PDF serialization of a `ReportDocument`.
//!
//! One A4 page per `Page`. Text is base-14 Helvetica (no embedded font), images
//! are RGB image XObjects, and every stream is Flate-compressed on save.

use std::f32::consts::FRAC_PI_2;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::layout::font_metrics::{A4_HEIGHT_PT, A4_WIDTH_PT, HELVETICA};
use crate::raster::DecodedRaster;
use crate::report::chart::{self, ChartLayout};
use crate::report::model::{
    report_title, CoverPage, ImageGridPage, Page, ReportDocument, TimeSeriesPage,
};
use crate::report::ReportError;

const FONT_NAME: &str = "F1";
const PAGE_MARGIN: f32 = 36.0;

// Chart plot area as fractions of the page (left, right, bottom, top).
const PLOT_LEFT: f32 = 0.1;
const PLOT_RIGHT: f32 = 0.9;
const PLOT_BOTTOM: f32 = 0.3;
const PLOT_TOP: f32 = 0.8;

const TICK_LEN: f32 = 4.0;
const TICK_FONT: f32 = 8.0;
const GRID_LABEL_FONT: f32 = 12.0;
const GRID_LABEL_BAND: f32 = 24.0;
const GRID_CELL_PAD: f32 = 6.0;

/// Serializes the document to PDF bytes.
pub fn render_pdf(report: &ReportDocument) -> Result<Vec<u8>, ReportError> {
    let mut writer = PdfWriter::new();
    for page in report.pages() {
        match page {
            Page::Cover(cover) => writer.add_page(cover_ops(cover), Dictionary::new())?,
            Page::TimeSeries(ts) => writer.add_page(chart_ops(ts), Dictionary::new())?,
            Page::ImageGrid(grid) => {
                let mut xobjects = Dictionary::new();
                let mut names = Vec::with_capacity(grid.images.len());
                for (i, image) in grid.images.iter().enumerate() {
                    let name = format!("Im{}", i + 1);
                    let id = writer.add_image(&image.raster);
                    xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
                    names.push(name);
                }
                writer.add_page(grid_ops(grid, &names), xobjects)?;
            }
        }
    }
    writer.finish(&report_title(report.farm_id()))
}

struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => HELVETICA.base_font,
            "Encoding" => "WinAnsiEncoding",
        });
        Self {
            doc,
            pages_id,
            font_id,
            page_ids: Vec::new(),
        }
    }

    fn add_image(&mut self, raster: &DecodedRaster) -> ObjectId {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(raster.width()),
            "Height" => i64::from(raster.height()),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        self.doc.add_object(Stream::new(dict, raster.rgb_on_white()))
    }

    fn add_page(&mut self, ops: Vec<Operation>, xobjects: Dictionary) -> Result<(), ReportError> {
        let content = Content { operations: ops }.encode()?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let mut resources = dictionary! {
            "Font" => dictionary! { FONT_NAME => self.font_id },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH_PT.into(), A4_HEIGHT_PT.into()],
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn finish(mut self, title: &str) -> Result<Vec<u8>, ReportError> {
        let count = self.page_ids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => count,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Producer" => Object::string_literal(env!("CARGO_PKG_NAME")),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.compress();

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Drawing primitives
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Ops(Vec<Operation>);

impl Ops {
    fn op(&mut self, operator: &str, operands: Vec<Object>) -> &mut Self {
        self.0.push(Operation::new(operator, operands));
        self
    }

    fn save(&mut self) -> &mut Self {
        self.op("q", vec![])
    }

    fn restore(&mut self) -> &mut Self {
        self.op("Q", vec![])
    }

    fn stroke_rgb(&mut self, [r, g, b]: [f32; 3]) -> &mut Self {
        self.op("RG", vec![r.into(), g.into(), b.into()])
    }

    fn fill_rgb(&mut self, [r, g, b]: [f32; 3]) -> &mut Self {
        self.op("rg", vec![r.into(), g.into(), b.into()])
    }

    fn line_width(&mut self, w: f32) -> &mut Self {
        self.op("w", vec![w.into()])
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> &mut Self {
        self.op("m", vec![x1.into(), y1.into()])
            .op("l", vec![x2.into(), y2.into()])
            .op("S", vec![])
    }

    fn rect_stroke(&mut self, x: f32, y: f32, w: f32, h: f32) -> &mut Self {
        self.op("re", vec![x.into(), y.into(), w.into(), h.into()])
            .op("S", vec![])
    }

    /// Text with its baseline starting at `(x, y)`, rotated `angle` radians.
    fn text_rotated(&mut self, x: f32, y: f32, size: f32, angle: f32, text: &str) -> &mut Self {
        let (sin, cos) = angle.sin_cos();
        self.op("BT", vec![])
            .op("Tf", vec![FONT_NAME.into(), size.into()])
            .op(
                "Tm",
                vec![
                    cos.into(),
                    sin.into(),
                    (-sin).into(),
                    cos.into(),
                    x.into(),
                    y.into(),
                ],
            )
            .op("Tj", vec![Object::string_literal(text)])
            .op("ET", vec![])
    }

    fn text(&mut self, x: f32, y: f32, size: f32, text: &str) -> &mut Self {
        self.text_rotated(x, y, size, 0.0, text)
    }

    fn text_centered(&mut self, cx: f32, y: f32, size: f32, text: &str) -> &mut Self {
        let x = cx - HELVETICA.width_pt(text, size) / 2.0;
        self.text(x, y, size, text)
    }

    fn text_right(&mut self, right: f32, y: f32, size: f32, text: &str) -> &mut Self {
        let x = right - HELVETICA.width_pt(text, size);
        self.text(x, y, size, text)
    }

    fn image(&mut self, name: &str, x: f32, y: f32, w: f32, h: f32) -> &mut Self {
        self.save()
            .op(
                "cm",
                vec![
                    w.into(),
                    0.into(),
                    0.into(),
                    h.into(),
                    x.into(),
                    y.into(),
                ],
            )
            .op("Do", vec![name.into()])
            .restore()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pages
// ────────────────────────────────────────────────────────────────────────────

fn cover_ops(cover: &CoverPage) -> Vec<Operation> {
    let mut ops = Ops::default();
    let cx = A4_WIDTH_PT / 2.0;
    ops.fill_rgb([0.0, 0.0, 0.0])
        .text_centered(cx, A4_HEIGHT_PT * 0.75, 24.0, &cover.title())
        .text_centered(cx, A4_HEIGHT_PT * 0.70, 12.0, &cover.generated_line());

    let rows = cover.table_rows();
    if !rows.is_empty() {
        metadata_table(&mut ops, &rows);
    }
    ops.0
}

/// Two-column "Parameter | Value" table centred in the lower half of the page.
fn metadata_table(ops: &mut Ops, rows: &[(String, String)]) {
    const FONT: f32 = 10.0;
    const ROW_H: f32 = 22.0;
    let col_w = (A4_WIDTH_PT - 4.0 * PAGE_MARGIN) / 2.0;
    let left = 2.0 * PAGE_MARGIN;
    let top = A4_HEIGHT_PT * 0.45;

    let header = ("Parameter".to_string(), "Value".to_string());
    ops.stroke_rgb([0.0, 0.0, 0.0]).line_width(0.5);
    for (i, (name, value)) in std::iter::once(&header).chain(rows.iter()).enumerate() {
        let y = top - (i as f32 + 1.0) * ROW_H;
        let baseline = y + (ROW_H - FONT) / 2.0 + 2.0;
        ops.rect_stroke(left, y, col_w, ROW_H)
            .rect_stroke(left + col_w, y, col_w, ROW_H)
            .text_centered(left + col_w / 2.0, baseline, FONT, name)
            .text_centered(left + col_w * 1.5, baseline, FONT, value);
    }
}

fn chart_ops(page: &TimeSeriesPage) -> Vec<Operation> {
    let mut ops = Ops::default();
    let x0 = A4_WIDTH_PT * PLOT_LEFT;
    let x1 = A4_WIDTH_PT * PLOT_RIGHT;
    let y0 = A4_HEIGHT_PT * PLOT_BOTTOM;
    let y1 = A4_HEIGHT_PT * PLOT_TOP;
    let (w, h) = (x1 - x0, y1 - y0);
    let chart: &ChartLayout = &page.chart;

    ops.fill_rgb([0.0, 0.0, 0.0])
        .text_centered((x0 + x1) / 2.0, y1 + 10.0, 14.0, chart::CHART_TITLE)
        .stroke_rgb([0.0, 0.0, 0.0])
        .line_width(0.8)
        .rect_stroke(x0, y0, w, h);

    for tick in &chart.y_ticks {
        let y = y0 + tick.position * h;
        ops.line(x0 - TICK_LEN, y, x0, y)
            .text_right(x0 - TICK_LEN - 2.0, y - TICK_FONT / 3.0, TICK_FONT, &tick.label);
    }

    let angle = chart::X_TICK_ROTATION_DEG.to_radians();
    for tick in &chart.x_ticks {
        let x = x0 + tick.position * w;
        // Rotated label ends just below its tick mark.
        let len = HELVETICA.width_pt(&tick.label, TICK_FONT);
        let (sin, cos) = angle.sin_cos();
        let end_y = y0 - TICK_LEN - 4.0;
        ops.line(x, y0 - TICK_LEN, x, y0).text_rotated(
            x - len * cos,
            end_y - len * sin,
            TICK_FONT,
            angle,
            &tick.label,
        );
    }

    ops.text_centered((x0 + x1) / 2.0, y0 - 80.0, 11.0, chart::X_LABEL)
        .text_rotated(x0 - 40.0, (y0 + y1) / 2.0, 11.0, FRAC_PI_2, chart::Y_LABEL);

    // Round caps so an isolated point still shows as a dot.
    ops.line_width(1.5).op("J", vec![1.into()]).op("j", vec![1.into()]);
    for line in &chart.lines {
        ops.stroke_rgb(line.metric.color());
        for run in line.points.split(Option::is_none) {
            let mut pts = run.iter().flatten().map(|(px, py)| (x0 + px * w, y0 + py * h));
            let Some((sx, sy)) = pts.next() else {
                continue;
            };
            ops.op("m", vec![sx.into(), sy.into()]);
            let mut drew = false;
            for (lx, ly) in pts {
                ops.op("l", vec![lx.into(), ly.into()]);
                drew = true;
            }
            if !drew {
                ops.op("l", vec![sx.into(), sy.into()]);
            }
            ops.op("S", vec![]);
        }
    }

    legend(&mut ops, chart, x1, y1);
    ops.0
}

/// Legend in the upper-right corner of the plot.
fn legend(ops: &mut Ops, chart: &ChartLayout, plot_right: f32, plot_top: f32) {
    const FONT: f32 = 9.0;
    const ROW_H: f32 = 13.0;
    const SAMPLE: f32 = 18.0;
    let label_w = chart
        .lines
        .iter()
        .map(|l| HELVETICA.width_pt(l.metric.label(), FONT))
        .fold(0.0_f32, f32::max);
    let box_w = SAMPLE + label_w + 16.0;
    let box_h = ROW_H * chart.lines.len() as f32 + 6.0;
    let left = plot_right - box_w - 8.0;
    let top = plot_top - 8.0;

    ops.line_width(0.5)
        .stroke_rgb([0.6, 0.6, 0.6])
        .rect_stroke(left, top - box_h, box_w, box_h)
        .line_width(1.5);
    for (i, line) in chart.lines.iter().enumerate() {
        let y = top - 3.0 - ROW_H * (i as f32 + 0.5);
        ops.stroke_rgb(line.metric.color())
            .line(left + 4.0, y, left + 4.0 + SAMPLE, y)
            .fill_rgb([0.0, 0.0, 0.0])
            .text(left + SAMPLE + 8.0, y - FONT / 3.0, FONT, line.metric.label());
    }
}

/// Images row-major in the page geometry, each under its date label. Unused
/// slots get nothing drawn, not even a frame.
fn grid_ops(page: &ImageGridPage, names: &[String]) -> Vec<Operation> {
    let mut ops = Ops::default();
    let area_w = A4_WIDTH_PT - 2.0 * PAGE_MARGIN;
    let area_h = A4_HEIGHT_PT - 2.0 * PAGE_MARGIN;
    let cell_w = area_w / page.geometry.cols as f32;
    let cell_h = area_h / page.geometry.rows as f32;

    ops.fill_rgb([0.0, 0.0, 0.0]);
    for (i, (image, name)) in page.images.iter().zip(names).enumerate() {
        let (row, col) = page.geometry.cell(i);
        let left = PAGE_MARGIN + col as f32 * cell_w;
        let top = A4_HEIGHT_PT - PAGE_MARGIN - row as f32 * cell_h;

        ops.text_centered(
            left + cell_w / 2.0,
            top - GRID_LABEL_FONT - 4.0,
            GRID_LABEL_FONT,
            image.artifact.date_label(),
        );

        let box_w = cell_w - 2.0 * GRID_CELL_PAD;
        let box_h = cell_h - GRID_LABEL_BAND - 2.0 * GRID_CELL_PAD;
        let (w, h) = fit(image.raster.width(), image.raster.height(), box_w, box_h);
        let x = left + (cell_w - w) / 2.0;
        let y = top - GRID_LABEL_BAND - GRID_CELL_PAD - (box_h + h) / 2.0;
        ops.image(name, x, y, w, h);
    }
    ops.0
}

/// Largest size with the raster's aspect ratio inside `box_w × box_h`.
fn fit(px_w: u32, px_h: u32, box_w: f32, box_h: f32) -> (f32, f32) {
    let scale = (box_w / px_w as f32).min(box_h / px_h as f32);
    (px_w as f32 * scale, px_h as f32 * scale)
}
