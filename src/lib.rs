mod atlas;
mod blit;
mod codec;
mod debug;
mod error;
mod grid;
mod layout;
mod manifest;
mod metrics;
mod perf;
mod text;
mod types;

pub use atlas::{GlyphAtlas, GlyphMetrics, GlyphRect, find_default_font, system_font_dirs};
pub use blit::{blit, blit_with_border, bordered_cell};
pub use codec::{decode_source, encode_png, encode_png_bytes, source_dimensions};
use debug::DebugLogger;
pub use error::TileSheetError;
pub use grid::{Canvas, Grid};
pub use layout::LabelStyle;
pub use layout::packer::{
    AssetSource, FileAssets, MARGIN_THRESHOLD, PackGeometry, PackOptions, PagePlan, PageSink,
    PageState, PngPageWriter, plan_pages,
};
pub use layout::perimeter::{Heading, PerimeterWalk, WalkStep, perimeter_cell_side};
pub use manifest::{PackEntry, RowIssue, TabularManifest, pack_entries, parse_str as parse_manifest};
pub use metrics::{GridMetrics, PackMetrics, PageMetrics};
use perf::{PerfLogger, SpanTimer};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
pub use text::{TextExtent, blend, draw_text_centered, measure};
pub use types::{Color, ColorF, GapSize, Point, Size};

pub const DEFAULT_CANVAS_SIZE: Size = Size::new(3034, 2135);
pub const DEFAULT_FONT_PIXEL_SIZE: f32 = 64.0;

/// Reads a delimiter-separated manifest from disk.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<TabularManifest, TileSheetError> {
    manifest::load(path)
}

/// Configured layout engine. Built with [`TileSheet::builder`].
pub struct TileSheet {
    pack_options: PackOptions,
    canvas_size: Size,
    style: LabelStyle,
    font_path: Option<PathBuf>,
    font_pixel_size: f32,
    asset_root: Option<PathBuf>,
    atlas: OnceLock<GlyphAtlas>,
    debug: Option<DebugLogger>,
    perf: Option<PerfLogger>,
}

pub struct TileSheetBuilder {
    page_size: Size,
    gap: GapSize,
    canvas_size: Size,
    font_path: Option<PathBuf>,
    font_pixel_size: f32,
    foreground: Color,
    background: Color,
    border_size: u32,
    skip_missing_assets: bool,
    parallel_pages: bool,
    asset_root: Option<PathBuf>,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
}

impl TileSheet {
    pub fn builder() -> TileSheetBuilder {
        TileSheetBuilder::new()
    }

    pub fn pack_options(&self) -> &PackOptions {
        &self.pack_options
    }

    pub fn label_style(&self) -> &LabelStyle {
        &self.style
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    /// The label atlas, baked on first use. Without a configured font, or if
    /// the font fails to load, the atlas is empty and labels are not drawn.
    pub fn atlas(&self) -> &GlyphAtlas {
        self.atlas.get_or_init(|| match &self.font_path {
            Some(path) => GlyphAtlas::load_or_empty(path, self.font_pixel_size),
            None => {
                log::warn!("no font configured, labels will be blank");
                GlyphAtlas::empty()
            }
        })
    }

    fn instruments(&self) -> layout::packer::Instruments<'_> {
        layout::packer::Instruments {
            debug: self.debug.as_ref(),
            perf: self.perf.as_ref(),
        }
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_ref() {
            logger.emit_summary(context);
            logger.flush();
        }
        if let Some(perf) = self.perf.as_ref() {
            perf.flush();
        }
    }

    /// Packs the manifest's assets onto pages, resolving asset names against
    /// the configured asset root.
    pub fn pack(
        &self,
        manifest: &TabularManifest,
        sink: &mut dyn PageSink,
    ) -> Result<PackMetrics, TileSheetError> {
        let assets = FileAssets::new(self.asset_root.clone());
        self.pack_with_assets(manifest, &assets, sink)
    }

    pub fn pack_with_assets(
        &self,
        manifest: &TabularManifest,
        assets: &dyn AssetSource,
        sink: &mut dyn PageSink,
    ) -> Result<PackMetrics, TileSheetError> {
        let result = layout::packer::pack_instrumented(
            manifest,
            &self.pack_options,
            assets,
            sink,
            self.instruments(),
        );
        self.emit_debug_summary("pack");
        result
    }

    /// Packs a manifest file into `<prefix><page>.png` files. Relative asset
    /// paths resolve against the manifest's directory unless an asset root
    /// was configured.
    pub fn pack_manifest_file(
        &self,
        manifest_path: impl AsRef<Path>,
        prefix: &str,
    ) -> Result<PackMetrics, TileSheetError> {
        let manifest_path = manifest_path.as_ref();
        let manifest = manifest::load(manifest_path)?;
        let root = self.asset_root.clone().or_else(|| {
            manifest_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        });
        let mut writer = PngPageWriter::new(prefix);
        self.pack_with_assets(&manifest, &FileAssets::new(root), &mut writer)
    }

    pub fn render_table(
        &self,
        labels: &TabularManifest,
    ) -> Result<(Canvas, GridMetrics), TileSheetError> {
        let timer = SpanTimer::start();
        let result = layout::table::render_table(self.canvas_size, labels, &self.style, self.atlas());
        self.finish_grid("table", timer, result)
    }

    /// Numbered cells around the canvas edge, one fewer than `count`.
    pub fn render_perimeter(&self, count: usize) -> Result<(Canvas, GridMetrics), TileSheetError> {
        let timer = SpanTimer::start();
        let result =
            layout::perimeter::render_perimeter(self.canvas_size, count, &self.style, self.atlas());
        self.finish_grid("perimeter", timer, result)
    }

    fn finish_grid(
        &self,
        context: &str,
        timer: SpanTimer,
        result: Result<(Canvas, GridMetrics), TileSheetError>,
    ) -> Result<(Canvas, GridMetrics), TileSheetError> {
        let render_ms = timer.finish(self.perf.as_ref(), "grid.render", None);
        let result = result.map(|(canvas, mut metrics)| {
            metrics.render_ms = render_ms;
            if let Some(logger) = self.debug.as_ref() {
                logger.event(
                    "grid.render",
                    &[
                        ("layout", context.into()),
                        ("cells", metrics.cells.into()),
                        ("columns", metrics.columns.into()),
                        ("rows", metrics.rows.into()),
                    ],
                );
                logger.increment("cells.drawn", metrics.cells as u64);
            }
            (canvas, metrics)
        });
        self.emit_debug_summary(context);
        result
    }

    pub fn write_table(
        &self,
        manifest_path: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<GridMetrics, TileSheetError> {
        let labels = manifest::load(manifest_path)?;
        let (canvas, metrics) = self.render_table(&labels)?;
        write_canvas(&canvas, output.as_ref(), self.perf.as_ref())?;
        Ok(metrics)
    }

    pub fn write_perimeter(
        &self,
        count: usize,
        output: impl AsRef<Path>,
    ) -> Result<GridMetrics, TileSheetError> {
        let (canvas, metrics) = self.render_perimeter(count)?;
        write_canvas(&canvas, output.as_ref(), self.perf.as_ref())?;
        Ok(metrics)
    }
}

fn write_canvas(canvas: &Canvas, output: &Path, perf: Option<&PerfLogger>) -> Result<(), TileSheetError> {
    let timer = SpanTimer::start();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    encode_png(canvas, output)?;
    timer.finish(perf, "page.encode", Some(0));
    if let Some(perf) = perf {
        perf.flush();
    }
    log::info!("wrote {}", output.display());
    Ok(())
}

impl Default for TileSheetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSheetBuilder {
    pub fn new() -> Self {
        let pack = PackOptions::default();
        let style = LabelStyle::default();
        Self {
            page_size: pack.page_size,
            gap: pack.gap,
            canvas_size: DEFAULT_CANVAS_SIZE,
            font_path: None,
            font_pixel_size: DEFAULT_FONT_PIXEL_SIZE,
            foreground: style.foreground,
            background: style.background,
            border_size: style.border as u32,
            skip_missing_assets: pack.skip_missing_assets,
            parallel_pages: pack.parallel_pages,
            asset_root: None,
            debug_path: None,
            perf_path: None,
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn border_gap(mut self, gap: GapSize) -> Self {
        self.gap = gap;
        self
    }

    pub fn canvas_size(mut self, size: Size) -> Self {
        self.canvas_size = size;
        self
    }

    pub fn font(mut self, path: impl Into<PathBuf>, pixel_size: f32) -> Self {
        self.font_path = Some(path.into());
        self.font_pixel_size = pixel_size;
        self
    }

    pub fn font_pixel_size(mut self, pixel_size: f32) -> Self {
        self.font_pixel_size = pixel_size;
        self
    }

    pub fn foreground(mut self, color: Color) -> Self {
        self.foreground = color;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn border_size(mut self, pixels: u32) -> Self {
        self.border_size = pixels;
        self
    }

    pub fn skip_missing_assets(mut self, skip: bool) -> Self {
        self.skip_missing_assets = skip;
        self
    }

    pub fn parallel_pages(mut self, enabled: bool) -> Self {
        self.parallel_pages = enabled;
        self
    }

    /// Directory that relative asset paths resolve against.
    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    pub fn debug_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<TileSheet, TileSheetError> {
        if self.page_size.is_empty() {
            return Err(TileSheetError::InvalidConfiguration(format!(
                "page size must be non-zero, got {}x{}",
                self.page_size.width, self.page_size.height
            )));
        }
        if self.canvas_size.is_empty() {
            return Err(TileSheetError::InvalidConfiguration(format!(
                "canvas size must be non-zero, got {}x{}",
                self.canvas_size.width, self.canvas_size.height
            )));
        }
        if !self.font_pixel_size.is_finite() || self.font_pixel_size <= 0.0 {
            return Err(TileSheetError::InvalidConfiguration(format!(
                "font pixel size must be > 0, got {}",
                self.font_pixel_size
            )));
        }
        let debug = self.debug_path.as_ref().map(DebugLogger::new).transpose()?;
        let perf = self.perf_path.as_ref().map(PerfLogger::new).transpose()?;
        Ok(TileSheet {
            pack_options: PackOptions {
                page_size: self.page_size,
                gap: self.gap,
                skip_missing_assets: self.skip_missing_assets,
                parallel_pages: self.parallel_pages,
            },
            canvas_size: self.canvas_size,
            style: LabelStyle {
                foreground: self.foreground,
                background: self.background,
                border: self.border_size as usize,
            },
            font_path: self.font_path,
            font_pixel_size: self.font_pixel_size,
            asset_root: self.asset_root,
            atlas: OnceLock::new(),
            debug,
            perf,
        })
    }
}
