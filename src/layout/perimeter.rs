//! Numbered cells walked around the canvas edge.
//!
//! The cell side is `(2W + 2H) / (N + 4)`. Starting top-left the walk runs
//! right for `W / side` steps, down for `H / side - 1`, left for `W / side`,
//! then snaps back to column 0 and runs up for `H / side`, and repeats. Each
//! leg ends when its step budget reaches zero.

use crate::atlas::GlyphAtlas;
use crate::blit::{blit, bordered_cell};
use crate::error::TileSheetError;
use crate::grid::{Canvas, Grid};
use crate::layout::{LabelStyle, round_half_up};
use crate::metrics::GridMetrics;
use crate::text::draw_text_centered;
use crate::types::{Point, Size};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Right,
    Down,
    Left,
    Up,
}

impl Heading {
    fn delta(self) -> (i64, i64) {
        match self {
            Heading::Right => (1, 0),
            Heading::Down => (0, 1),
            Heading::Left => (-1, 0),
            Heading::Up => (0, -1),
        }
    }
}

/// One visited cell, in cell units. `heading` is the direction the walk was
/// travelling when it arrived; the first cell reports the initial heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    pub index: usize,
    pub column: i64,
    pub row: i64,
    pub heading: Heading,
}

/// Unbounded walk; callers `take` as many cells as they need.
#[derive(Debug, Clone)]
pub struct PerimeterWalk {
    columns: i64,
    rows: i64,
    column: i64,
    row: i64,
    heading: Heading,
    arrived: Heading,
    remaining: i64,
    index: usize,
}

impl PerimeterWalk {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns: columns as i64,
            rows: rows as i64,
            column: 0,
            row: 0,
            heading: Heading::Right,
            arrived: Heading::Right,
            remaining: columns as i64,
            index: 0,
        }
    }

    fn turn(&mut self) {
        let (heading, budget) = match self.heading {
            Heading::Right => (Heading::Down, self.rows - 1),
            Heading::Down => (Heading::Left, self.columns),
            Heading::Left => {
                self.column = 0;
                (Heading::Up, self.rows)
            }
            Heading::Up => (Heading::Right, self.columns),
        };
        self.heading = heading;
        self.remaining = budget;
    }
}

impl Iterator for PerimeterWalk {
    type Item = WalkStep;

    fn next(&mut self) -> Option<WalkStep> {
        let step = WalkStep {
            index: self.index,
            column: self.column,
            row: self.row,
            heading: self.arrived,
        };
        self.remaining -= 1;
        if self.remaining <= 0 {
            self.turn();
        }
        let (dx, dy) = self.heading.delta();
        self.column += dx;
        self.row += dy;
        self.arrived = self.heading;
        self.index += 1;
        Some(step)
    }
}

pub fn perimeter_cell_side(canvas: Size, count: usize) -> f32 {
    (2 * canvas.width as u64 + 2 * canvas.height as u64) as f32 / (count + 4) as f32
}

/// Draws cells `0..count - 1` of the walk, each labeled with its index.
pub fn render_perimeter(
    canvas_size: Size,
    count: usize,
    style: &LabelStyle,
    atlas: &GlyphAtlas,
) -> Result<(Canvas, GridMetrics), TileSheetError> {
    let side = round_half_up(perimeter_cell_side(canvas_size, count));
    if side == 0 {
        return Err(TileSheetError::DegenerateLayout(format!(
            "{count} cells on a {}x{} canvas leave a zero-sized cell",
            canvas_size.width, canvas_size.height
        )));
    }
    let mut canvas = Grid::filled(
        canvas_size.width as usize,
        canvas_size.height as usize,
        style.background,
    );
    let stencil = bordered_cell(side, side, style.border, style.foreground, style.background);
    let columns = canvas_size.width as usize / side;
    let rows = canvas_size.height as usize / side;
    debug!("perimeter layout: side={side} columns={columns} rows={rows} count={count}");

    let mut cells = 0;
    for step in PerimeterWalk::new(columns, rows).take(count.saturating_sub(1)) {
        let at = Point::new(step.column * side as i64, step.row * side as i64);
        blit(&stencil, &mut canvas, at);
        let center = Point::new(at.x + (side / 2) as i64, at.y + (side / 2) as i64);
        draw_text_centered(
            &mut canvas,
            atlas,
            &step.index.to_string(),
            center,
            style.foreground,
        );
        cells += 1;
    }

    Ok((
        canvas,
        GridMetrics {
            cells,
            cell_size: Some(Size::new(side as u32, side as u32)),
            columns,
            rows,
            render_ms: 0.0,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    fn headings(columns: usize, rows: usize, n: usize) -> Vec<Heading> {
        PerimeterWalk::new(columns, rows)
            .take(n)
            .map(|s| s.heading)
            .collect()
    }

    #[test]
    fn two_by_two_walk_turns_in_order() {
        use Heading::*;
        assert_eq!(headings(2, 2, 5), vec![Right, Right, Down, Left, Left]);
    }

    #[test]
    fn walk_hugs_the_perimeter() {
        let cells: Vec<(i64, i64)> = PerimeterWalk::new(4, 3)
            .take(12)
            .map(|s| (s.column, s.row))
            .collect();
        assert_eq!(
            cells,
            vec![
                (0, 0),
                (1, 0),
                (2, 0),
                (3, 0),
                (3, 1),
                (3, 2),
                (2, 2),
                (1, 2),
                (0, 2),
                (-1, 2),
                (0, 1),
                (0, 0),
            ]
        );
    }

    #[test]
    fn indices_are_sequential() {
        let indices: Vec<usize> = PerimeterWalk::new(3, 3).take(7).map(|s| s.index).collect();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn degenerate_grid_does_not_stall() {
        let steps: Vec<WalkStep> = PerimeterWalk::new(0, 0).take(6).collect();
        assert_eq!(steps.len(), 6);
    }

    #[test]
    fn cell_side_formula() {
        assert_eq!(perimeter_cell_side(Size::new(300, 200), 6), 100.0);
        let side = perimeter_cell_side(Size::new(3034, 2135), 72);
        assert!((side - 136.026).abs() < 1e-3, "{side}");
    }

    #[test]
    fn single_item_draws_no_cells() {
        let style = LabelStyle::default();
        let (canvas, metrics) =
            render_perimeter(Size::new(50, 40), 1, &style, &GlyphAtlas::empty()).expect("render");
        assert_eq!(metrics.cells, 0);
        assert!(canvas.as_slice().iter().all(|c| *c == style.background));
    }

    #[test]
    fn cells_are_framed_with_foreground() {
        let style = LabelStyle {
            foreground: Color::BLACK,
            background: Color::WHITE,
            border: 1,
        };
        // side = (600 + 400) / 10 = 100 -> 3 columns, 2 rows.
        let (canvas, metrics) =
            render_perimeter(Size::new(300, 200), 6, &style, &GlyphAtlas::empty()).expect("render");
        assert_eq!(metrics.cells, 5);
        assert_eq!(metrics.cell_size, Some(Size::new(100, 100)));
        assert_eq!((metrics.columns, metrics.rows), (3, 2));
        // cells 0..=2 across the top, 3 at (2,1), 4 at (1,1)
        for (cx, cy) in [(0, 0), (100, 0), (200, 0), (200, 100), (100, 100)] {
            assert_eq!(canvas.get(cx, cy), Some(&Color::BLACK));
            assert_eq!(canvas.get(cx + 50, cy + 50), Some(&Color::WHITE));
        }
        // (0,1) is never reached with five cells
        assert_eq!(canvas.get(0, 100), Some(&Color::WHITE));
    }

    #[test]
    fn overwhelming_count_is_degenerate() {
        let err = render_perimeter(
            Size::new(2, 2),
            100,
            &LabelStyle::default(),
            &GlyphAtlas::empty(),
        )
        .expect_err("degenerate");
        assert!(matches!(err, TileSheetError::DegenerateLayout(_)));
    }
}
