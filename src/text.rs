use crate::atlas::GlyphAtlas;
use crate::grid::Canvas;
use crate::types::{Color, Point};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtent {
    /// Sum of advances.
    pub width: f32,
    /// Tallest glyph rectangle.
    pub height: f32,
}

/// Characters the atlas has no entry for contribute nothing.
pub fn measure(atlas: &GlyphAtlas, text: &str) -> TextExtent {
    let mut extent = TextExtent::default();
    for glyph in text.chars().filter_map(|ch| atlas.glyph(ch)) {
        extent.width += glyph.advance;
        extent.height = extent.height.max(glyph.rect.height as f32);
    }
    extent
}

/// Linear blend of `over` onto `under`, weighted by `coverage / 255`.
pub fn blend(over: Color, under: Color, coverage: u8) -> Color {
    if over == under {
        return over;
    }
    let weight = coverage as f32 / 255.0;
    over.to_f32().mix(under.to_f32(), weight).to_color()
}

/// Composites `text` centered on `center`. Pixels outside the canvas are
/// skipped. Returns the number of glyphs drawn.
pub fn draw_text_centered(
    canvas: &mut Canvas,
    atlas: &GlyphAtlas,
    text: &str,
    center: Point,
    color: Color,
) -> usize {
    let extent = measure(atlas, text);
    let origin_x = round_half_up(center.x as f32 - 0.5 * extent.width);
    let origin_y = round_half_up(center.y as f32 + 0.5 * extent.height);

    let mut pen_x = origin_x as f32;
    let mut drawn = 0;
    for glyph in text.chars().filter_map(|ch| atlas.glyph(ch)) {
        let left = (pen_x + glyph.offset_x).floor() as i64;
        let top = origin_y + glyph.offset_y.floor() as i64;
        let rect = glyph.rect;
        for y in 0..rect.height as i64 {
            for x in 0..rect.width as i64 {
                let coverage = atlas.coverage(rect.x as i64 + x, rect.y as i64 + y);
                if let Some(pixel) = canvas.get_mut(left + x, top + y) {
                    *pixel = blend(color, *pixel, coverage);
                }
            }
        }
        pen_x += glyph.advance;
        drawn += 1;
    }
    drawn
}

fn round_half_up(value: f32) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{GlyphMetrics, GlyphRect};
    use crate::grid::Grid;

    /// Two 2x3 glyphs: 'I' fully inked, '.' half inked on its bottom row.
    fn tiny_atlas() -> GlyphAtlas {
        let mut bitmap = Grid::new(4, 3);
        for y in 0..3 {
            for x in 0..2 {
                bitmap.set(x, y, 255);
            }
        }
        bitmap.set(2, 2, 128);
        bitmap.set(3, 2, 128);
        let glyph = |x: u32| GlyphMetrics {
            rect: GlyphRect {
                x,
                y: 0,
                width: 2,
                height: 3,
            },
            offset_x: 0.0,
            offset_y: -3.0,
            advance: 3.0,
            pixel_size: 3.0,
        };
        GlyphAtlas::from_parts(bitmap, 3.0, [('I', glyph(0)), ('.', glyph(2))])
    }

    #[test]
    fn zero_coverage_keeps_destination() {
        let under = Color::rgba(12, 34, 56, 78);
        assert_eq!(blend(Color::BLACK, under, 0), under);
    }

    #[test]
    fn full_coverage_writes_exact_color_without_channel_swap() {
        let over = Color::rgba(10, 20, 30, 200);
        let result = blend(over, Color::WHITE, 255);
        assert_eq!(result, over);
        assert_eq!(result.r(), 10);
        assert_eq!(result.a(), 200);
    }

    #[test]
    fn partial_coverage_is_linear() {
        let result = blend(Color::BLACK, Color::WHITE, 51);
        assert_eq!(result, Color::rgba(204, 204, 204, 255));
    }

    #[test]
    fn unknown_characters_add_no_width_or_height() {
        let atlas = tiny_atlas();
        assert_eq!(
            measure(&atlas, "I\u{7f}é.\n"),
            TextExtent {
                width: 6.0,
                height: 3.0
            }
        );
        assert_eq!(measure(&atlas, "zz"), TextExtent::default());
    }

    #[test]
    fn text_is_centered_on_anchor() {
        let atlas = tiny_atlas();
        let mut canvas = Grid::filled(10, 10, Color::WHITE);
        let drawn = draw_text_centered(&mut canvas, &atlas, "I", Point::new(5, 5), Color::BLACK);
        assert_eq!(drawn, 1);
        // width 3 -> origin x = round(3.5) = 4; height 3 -> baseline y = round(6.5) = 7.
        for y in 0..10 {
            for x in 0..10 {
                let inked = (4..6).contains(&x) && (4..7).contains(&y);
                let expected = if inked { Color::BLACK } else { Color::WHITE };
                assert_eq!(canvas.get(x, y), Some(&expected), "({x},{y})");
            }
        }
    }

    #[test]
    fn glyphs_advance_and_blend_partial_coverage() {
        let atlas = tiny_atlas();
        let mut canvas = Grid::filled(12, 6, Color::WHITE);
        draw_text_centered(&mut canvas, &atlas, "I.", Point::new(6, 2), Color::BLACK);
        // width 6 -> origin x 3; second glyph starts at 6.
        assert_eq!(canvas.get(3, 2), Some(&Color::BLACK));
        let half = blend(Color::BLACK, Color::WHITE, 128);
        assert_eq!(canvas.get(6, 3), Some(&half));
        assert_eq!(canvas.get(6, 2), Some(&Color::WHITE));
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let atlas = tiny_atlas();
        let mut canvas = Grid::filled(2, 2, Color::WHITE);
        draw_text_centered(&mut canvas, &atlas, "III", Point::new(0, 0), Color::BLACK);
        assert_eq!(canvas.width(), 2);
    }

    #[test]
    fn empty_atlas_draws_nothing() {
        let mut canvas = Grid::filled(4, 4, Color::WHITE);
        let drawn = draw_text_centered(
            &mut canvas,
            &GlyphAtlas::empty(),
            "42",
            Point::new(2, 2),
            Color::BLACK,
        );
        assert_eq!(drawn, 0);
        assert!(canvas.as_slice().iter().all(|c| *c == Color::WHITE));
    }
}
