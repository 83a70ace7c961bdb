use crate::atlas::GlyphAtlas;
use crate::blit::{blit, bordered_cell};
use crate::error::TileSheetError;
use crate::grid::{Canvas, Grid};
use crate::layout::{LabelStyle, round_half_up};
use crate::manifest::TabularManifest;
use crate::metrics::GridMetrics;
use crate::text::draw_text_centered;
use crate::types::{Point, Size};
use log::debug;

/// One framed cell per manifest field, the canvas split evenly into
/// `labels.width() x labels.height()` cells. Empty fields still get a frame.
pub fn render_table(
    canvas_size: Size,
    labels: &TabularManifest,
    style: &LabelStyle,
    atlas: &GlyphAtlas,
) -> Result<(Canvas, GridMetrics), TileSheetError> {
    let mut canvas = Grid::filled(
        canvas_size.width as usize,
        canvas_size.height as usize,
        style.background,
    );
    if labels.is_empty() {
        return Ok((canvas, GridMetrics::default()));
    }

    let cell_w = canvas_size.width as f32 / labels.width() as f32;
    let cell_h = canvas_size.height as f32 / labels.height() as f32;
    let stencil_w = round_half_up(cell_w);
    let stencil_h = round_half_up(cell_h);
    if stencil_w == 0 || stencil_h == 0 {
        return Err(TileSheetError::DegenerateLayout(format!(
            "{}x{} labels on a {}x{} canvas leave a zero-sized cell",
            labels.width(),
            labels.height(),
            canvas_size.width,
            canvas_size.height
        )));
    }
    debug!(
        "table layout: cell={stencil_w}x{stencil_h} grid={}x{}",
        labels.width(),
        labels.height()
    );
    let stencil = bordered_cell(
        stencil_w,
        stencil_h,
        style.border,
        style.foreground,
        style.background,
    );

    let mut cells = 0;
    for (y, row) in labels.rows().enumerate() {
        for (x, label) in row.iter().enumerate() {
            let at = Point::new(
                (x as f32 * cell_w) as i64,
                (y as f32 * cell_h) as i64,
            );
            blit(&stencil, &mut canvas, at);
            let center = Point::new(
                at.x + (stencil_w / 2) as i64,
                at.y + (stencil_h / 2) as i64,
            );
            draw_text_centered(&mut canvas, atlas, label, center, style.foreground);
            cells += 1;
        }
    }

    Ok((
        canvas,
        GridMetrics {
            cells,
            cell_size: Some(Size::new(stencil_w as u32, stencil_h as u32)),
            columns: labels.width(),
            rows: labels.height(),
            render_ms: 0.0,
        },
    ))
}
