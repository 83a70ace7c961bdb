use crate::error::TileSheetError;
use crate::grid::Grid;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use ttf_parser::{GlyphId, OutlineBuilder};

/// First baked code point (space).
pub const FIRST_CHAR: u32 = 32;
/// Printable ASCII, 32..=126.
pub const GLYPH_COUNT: usize = 95;
pub const BITMAP_WIDTH: usize = 4096;
pub const MAX_BITMAP_HEIGHT: usize = 20480;

/// Rectangle of one glyph inside the shared coverage bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    pub rect: GlyphRect,
    /// Offset of the bitmap's top-left corner from the pen position on the
    /// baseline, y growing downward.
    pub offset_x: f32,
    pub offset_y: f32,
    pub advance: f32,
    pub pixel_size: f32,
}

/// Baked coverage bitmap plus metrics for printable ASCII. Loading another
/// font means building a new atlas; nothing is shared between atlases.
#[derive(Debug, Clone)]
pub struct GlyphAtlas {
    bitmap: Grid<u8>,
    glyphs: Vec<Option<GlyphMetrics>>,
    pixel_size: f32,
}

impl Default for GlyphAtlas {
    fn default() -> Self {
        Self::empty()
    }
}

impl GlyphAtlas {
    /// An atlas with no glyphs; every lookup misses and text draws nothing.
    pub fn empty() -> Self {
        Self {
            bitmap: Grid::empty(),
            glyphs: vec![None; GLYPH_COUNT],
            pixel_size: 0.0,
        }
    }

    /// Builds an atlas from an existing bitmap. Characters outside printable
    /// ASCII are ignored.
    pub fn from_parts(
        bitmap: Grid<u8>,
        pixel_size: f32,
        glyphs: impl IntoIterator<Item = (char, GlyphMetrics)>,
    ) -> Self {
        let mut atlas = Self {
            bitmap,
            glyphs: vec![None; GLYPH_COUNT],
            pixel_size,
        };
        for (ch, metrics) in glyphs {
            if let Some(slot) = slot_for(ch) {
                atlas.glyphs[slot] = Some(metrics);
            }
        }
        atlas
    }

    pub fn load(path: impl AsRef<Path>, pixel_size: f32) -> Result<Self, TileSheetError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|err| TileSheetError::missing(path, format!("cannot read font: {err}")))?;
        Self::bake(&data, pixel_size).map_err(|err| match err {
            TileSheetError::Codec(message) => TileSheetError::missing(path, message),
            other => other,
        })
    }

    /// Like [`GlyphAtlas::load`], but a font that cannot be read or parsed is
    /// logged and replaced by an empty atlas.
    pub fn load_or_empty(path: impl AsRef<Path>, pixel_size: f32) -> Self {
        match Self::load(path.as_ref(), pixel_size) {
            Ok(atlas) => atlas,
            Err(err) => {
                warn!("font unavailable, labels will be blank: {err}");
                Self::empty()
            }
        }
    }

    /// Rasterizes printable ASCII at `pixel_size` (ascender-to-descender
    /// height) and packs the glyphs row by row into one coverage bitmap.
    pub fn bake(font_data: &[u8], pixel_size: f32) -> Result<Self, TileSheetError> {
        if !pixel_size.is_finite() || pixel_size <= 0.0 {
            return Err(TileSheetError::InvalidConfiguration(format!(
                "font pixel size must be > 0, got {pixel_size}"
            )));
        }
        let face = ttf_parser::Face::parse(font_data, 0)
            .map_err(|err| TileSheetError::Codec(format!("invalid font data: {err}")))?;
        let units = (face.ascender() as i32 - face.descender() as i32).max(1);
        let scale = pixel_size / units as f32;

        let rendered: Vec<RenderedGlyph> = (0..GLYPH_COUNT as u32)
            .filter_map(|i| char::from_u32(FIRST_CHAR + i))
            .map(|ch| render_glyph(&face, ch, scale))
            .collect();

        let mut shelf = ShelfPacker::new(BITMAP_WIDTH, MAX_BITMAP_HEIGHT);
        let placements: Vec<Option<(usize, usize)>> = rendered
            .iter()
            .map(|glyph| shelf.place(glyph.coverage.width(), glyph.coverage.height()))
            .collect();

        let mut bitmap = Grid::new(BITMAP_WIDTH, shelf.used_height());
        let mut glyphs = vec![None; GLYPH_COUNT];
        for (slot, (glyph, placement)) in rendered.iter().zip(placements).enumerate() {
            let Some((x, y)) = placement else {
                warn!(
                    "glyph {:?} does not fit in the {}x{} atlas",
                    glyph.ch, BITMAP_WIDTH, MAX_BITMAP_HEIGHT
                );
                continue;
            };
            for (gy, row) in glyph.coverage.rows().enumerate() {
                for (gx, value) in row.iter().enumerate() {
                    bitmap.set((x + gx) as i64, (y + gy) as i64, *value);
                }
            }
            glyphs[slot] = Some(GlyphMetrics {
                rect: GlyphRect {
                    x: x as u32,
                    y: y as u32,
                    width: glyph.coverage.width() as u32,
                    height: glyph.coverage.height() as u32,
                },
                offset_x: glyph.offset_x,
                offset_y: glyph.offset_y,
                advance: glyph.advance,
                pixel_size,
            });
        }
        debug!(
            "baked {} glyphs at {pixel_size}px into {}x{} bitmap",
            glyphs.iter().filter(|g| g.is_some()).count(),
            bitmap.width(),
            bitmap.height()
        );
        Ok(Self {
            bitmap,
            glyphs,
            pixel_size,
        })
    }

    /// `None` for anything outside printable ASCII.
    pub fn glyph(&self, ch: char) -> Option<&GlyphMetrics> {
        slot_for(ch).and_then(|slot| self.glyphs[slot].as_ref())
    }

    /// Coverage at a bitmap coordinate; 0 outside the bitmap.
    pub fn coverage(&self, x: i64, y: i64) -> u8 {
        self.bitmap.get(x, y).copied().unwrap_or(0)
    }

    pub fn bitmap(&self) -> &Grid<u8> {
        &self.bitmap
    }

    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.iter().all(Option::is_none)
    }
}

fn slot_for(ch: char) -> Option<usize> {
    let code = ch as u32;
    if code < FIRST_CHAR {
        return None;
    }
    let slot = (code - FIRST_CHAR) as usize;
    (slot < GLYPH_COUNT).then_some(slot)
}

struct RenderedGlyph {
    ch: char,
    coverage: Grid<u8>,
    offset_x: f32,
    offset_y: f32,
    advance: f32,
}

fn render_glyph(face: &ttf_parser::Face<'_>, ch: char, scale: f32) -> RenderedGlyph {
    let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
    let advance = face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
    let blank = RenderedGlyph {
        ch,
        coverage: Grid::empty(),
        offset_x: 0.0,
        offset_y: 0.0,
        advance,
    };
    let Some(bbox) = face.glyph_bounding_box(gid) else {
        return blank;
    };
    let x0 = (bbox.x_min as f32 * scale).floor();
    let y0 = (-(bbox.y_max as f32) * scale).floor();
    let x1 = (bbox.x_max as f32 * scale).ceil();
    let y1 = (-(bbox.y_min as f32) * scale).ceil();
    let width = (x1 - x0).max(0.0) as u32;
    let height = (y1 - y0).max(0.0) as u32;
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return blank;
    };

    let mut builder = GlyphPathBuilder::new(-x0, -y0, scale);
    if face.outline_glyph(gid, &mut builder).is_none() {
        return blank;
    }
    let Some(path) = builder.finish() else {
        return blank;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    let alpha: Vec<u8> = pixmap.data().chunks_exact(4).map(|px| px[3]).collect();
    RenderedGlyph {
        ch,
        coverage: Grid::from_vec(width as usize, height as usize, alpha)
            .unwrap_or_else(Grid::empty),
        offset_x: x0,
        offset_y: y0,
        advance,
    }
}

/// Row-based packing with a one pixel gutter around every glyph.
struct ShelfPacker {
    width: usize,
    max_height: usize,
    x: usize,
    y: usize,
    bottom: usize,
}

impl ShelfPacker {
    fn new(width: usize, max_height: usize) -> Self {
        Self {
            width,
            max_height,
            x: 1,
            y: 1,
            bottom: 1,
        }
    }

    fn place(&mut self, width: usize, height: usize) -> Option<(usize, usize)> {
        if width + 2 > self.width {
            return None;
        }
        if self.x + width + 1 >= self.width {
            self.y = self.bottom;
            self.x = 1;
        }
        if self.y + height + 1 >= self.max_height {
            return None;
        }
        let placed = (self.x, self.y);
        self.x += width + 1;
        self.bottom = self.bottom.max(self.y + height + 1);
        Some(placed)
    }

    fn used_height(&self) -> usize {
        (self.bottom + 1).min(self.max_height)
    }
}

/// Maps font units into a glyph-local pixel box, flipping y to point down.
struct GlyphPathBuilder {
    builder: PathBuilder,
    shift_x: f32,
    shift_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(shift_x: f32, shift_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            shift_x,
            shift_y,
            scale,
        }
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.shift_x, -y * self.scale + self.shift_y)
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Directories searched when no font path is configured. `TILESHEET_FONT_DIR`
/// entries come first.
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(extra) = std::env::var("TILESHEET_FONT_DIR") {
        for path in std::env::split_paths(&extra) {
            if !path.as_os_str().is_empty() {
                dirs.push(path);
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".fonts"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    dirs
}

const DEFAULT_FONT_FILES: [&str; 5] = [
    "arial.ttf",
    "DejaVuSans.ttf",
    "LiberationSans-Regular.ttf",
    "Helvetica.ttc",
    "FreeSans.ttf",
];

/// First file among the well-known sans-serif faces, searching `dirs` up to
/// three levels deep.
pub fn find_default_font(dirs: &[PathBuf]) -> Option<PathBuf> {
    for name in DEFAULT_FONT_FILES {
        for dir in dirs {
            if let Some(found) = find_file(dir, name, 3) {
                return Some(found);
            }
        }
    }
    None
}

fn find_file(dir: &Path, name: &str, depth: usize) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path
            .file_name()
            .and_then(|v| v.to_str())
            .is_some_and(|v| v.eq_ignore_ascii_case(name))
        {
            return Some(path);
        }
    }
    if depth == 0 {
        return None;
    }
    subdirs.sort();
    subdirs
        .iter()
        .find_map(|sub| find_file(sub, name, depth - 1))
}
