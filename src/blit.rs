use crate::grid::{Canvas, Grid};
use crate::types::{Color, GapSize, Point};

/// Copies every pixel of `src` to `dst` at `at`. Destination pixels outside
/// `dst` are skipped. Returns how many pixels were written.
pub fn blit(src: &Canvas, dst: &mut Canvas, at: Point) -> usize {
    let mut written = 0;
    for (y, row) in src.rows().enumerate() {
        for (x, color) in row.iter().enumerate() {
            if dst.set(at.x + x as i64, at.y + y as i64, *color) {
                written += 1;
            }
        }
    }
    written
}

/// Like [`blit`], but the footprint grows by `border` on each side. The band
/// is painted with `fill` and `src` lands inside it.
pub fn blit_with_border(src: &Canvas, dst: &mut Canvas, at: Point, border: GapSize, fill: Color) {
    let (bx, by) = (border.x as i64, border.y as i64);
    let (w, h) = (src.width() as i64, src.height() as i64);
    for y in 0..h + 2 * by {
        for x in 0..w + 2 * bx {
            let Some(pixel) = dst.get_mut(at.x + x, at.y + y) else {
                continue;
            };
            *pixel = src.get(x - bx, y - by).copied().unwrap_or(fill);
        }
    }
}

/// A `width x height` stencil: `foreground` within `border` pixels of any
/// edge, `background` inside.
pub fn bordered_cell(
    width: usize,
    height: usize,
    border: usize,
    foreground: Color,
    background: Color,
) -> Canvas {
    let mut cell = Grid::filled(width, height, foreground);
    let inner_w = width.saturating_sub(border);
    let inner_h = height.saturating_sub(border);
    for y in border..inner_h {
        for x in border..inner_w {
            cell.set(x as i64, y as i64, background);
        }
    }
    cell
}

#[cfg(test)]
mod tests {
    use super::*;

    const INK: Color = Color::rgb(200, 10, 10);

    #[test]
    fn blit_clips_to_destination() {
        let src = Grid::filled(3, 3, INK);
        let mut dst = Grid::filled(4, 4, Color::WHITE);
        let written = blit(&src, &mut dst, Point::new(2, -1));
        assert_eq!(written, 4);
        assert_eq!(dst.get(2, 0), Some(&INK));
        assert_eq!(dst.get(3, 1), Some(&INK));
        assert_eq!(dst.get(1, 0), Some(&Color::WHITE));
        assert_eq!(dst.get(2, 2), Some(&Color::WHITE));
    }

    #[test]
    fn blit_entirely_outside_is_a_no_op() {
        let src = Grid::filled(2, 2, INK);
        let mut dst = Grid::filled(2, 2, Color::WHITE);
        assert_eq!(blit(&src, &mut dst, Point::new(-5, 10)), 0);
    }

    #[test]
    fn bordered_blit_frames_source_with_fill() {
        let src = Grid::filled(2, 1, INK);
        let mut dst = Grid::filled(6, 5, Color::WHITE);
        blit_with_border(
            &src,
            &mut dst,
            Point::new(1, 1),
            GapSize::new(1, 1),
            Color::MARGIN_FILL,
        );
        let expected = [
            "......",
            ".mmmm.",
            ".mIIm.",
            ".mmmm.",
            "......",
        ];
        for (y, line) in expected.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let want = match ch {
                    'm' => Color::MARGIN_FILL,
                    'I' => INK,
                    _ => Color::WHITE,
                };
                assert_eq!(dst.get(x as i64, y as i64), Some(&want), "({x},{y})");
            }
        }
    }

    #[test]
    fn stencil_has_border_band_and_interior() {
        let cell = bordered_cell(5, 4, 1, Color::BLACK, Color::WHITE);
        assert_eq!(cell.get(0, 0), Some(&Color::BLACK));
        assert_eq!(cell.get(4, 3), Some(&Color::BLACK));
        assert_eq!(cell.get(1, 1), Some(&Color::WHITE));
        assert_eq!(cell.get(3, 2), Some(&Color::WHITE));
        assert_eq!(cell.get(4, 2), Some(&Color::BLACK));
        assert_eq!(cell.get(2, 3), Some(&Color::BLACK));
    }

    #[test]
    fn stencil_border_wider_than_cell_is_solid() {
        let cell = bordered_cell(3, 3, 2, Color::BLACK, Color::WHITE);
        assert!(cell.as_slice().iter().all(|c| *c == Color::BLACK));
    }
}
