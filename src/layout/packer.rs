//! Uniform-cell packing of repeated image assets across fixed-size pages.
//!
//! Every asset in the manifest is decoded once up front; the largest width
//! and height plus the border gap become the cell. Rows whose asset fails to
//! decode are dropped (or abort the run) before any page is produced. Cells are laid out row-major in
//! a block centered on the page, and a page is handed to the [`PageSink`] as
//! soon as its last slot is filled.

use crate::blit::blit_with_border;
use crate::codec;
use crate::debug::DebugLogger;
use crate::error::TileSheetError;
use crate::grid::{Canvas, Grid};
use crate::manifest::{PackEntry, RowIssue, TabularManifest, pack_entries};
use crate::metrics::{PackMetrics, PageMetrics};
use crate::perf::{PerfLogger, SpanTimer};
use crate::types::{Color, GapSize, Point, Size};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Leftover page space on either axis below which one column (or row) is
/// dropped so the packed block keeps a visible margin.
pub const MARGIN_THRESHOLD: u32 = 200;
pub const PAGE_BACKGROUND: Color = Color::WHITE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackGeometry {
    pub cell: Size,
    pub columns: u32,
    pub rows: u32,
    /// Top-left of the packed block.
    pub offset: Point,
}

impl PackGeometry {
    pub fn compute(page: Size, largest: Size, gap: GapSize) -> Result<Self, TileSheetError> {
        let (Some(cell_w), Some(cell_h)) = (
            largest.width.checked_add(gap.x),
            largest.height.checked_add(gap.y),
        ) else {
            return Err(TileSheetError::DegenerateLayout(format!(
                "cell size overflows: asset {}x{} plus gap {}x{}",
                largest.width, largest.height, gap.x, gap.y
            )));
        };
        let cell = Size::new(cell_w, cell_h);
        if cell.is_empty() {
            return Err(TileSheetError::DegenerateLayout(format!(
                "cell size {}x{} is empty; no asset had a usable size",
                cell.width, cell.height
            )));
        }
        let columns = fit_with_margin(page.width, cell.width);
        let rows = fit_with_margin(page.height, cell.height);
        if columns == 0 || rows == 0 {
            return Err(TileSheetError::DegenerateLayout(format!(
                "a {}x{} page holds {}x{} cells of {}x{} after margins",
                page.width, page.height, columns, rows, cell.width, cell.height
            )));
        }
        let offset = Point::new(
            ((page.width - columns * cell.width) / 2) as i64,
            ((page.height - rows * cell.height) / 2) as i64,
        );
        Ok(Self {
            cell,
            columns,
            rows,
            offset,
        })
    }

    pub fn capacity(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Top-left of slot `slot` on its page.
    pub fn slot_origin(&self, slot: usize) -> Point {
        let columns = self.columns as usize;
        let (column, row) = (slot % columns, slot / columns);
        self.offset
            + Point::new(
                column as i64 * self.cell.width as i64,
                row as i64 * self.cell.height as i64,
            )
    }
}

fn fit_with_margin(page: u32, cell: u32) -> u32 {
    let count = page / cell;
    if page - count * cell < MARGIN_THRESHOLD {
        count.saturating_sub(1)
    } else {
        count
    }
}

/// Where finished pages go. A page is owned by the sink once handed over.
pub trait PageSink {
    /// Returns the location written, if any.
    fn write_page(&mut self, page_index: usize, page: Canvas)
    -> Result<Option<PathBuf>, TileSheetError>;
}

/// Collects pages in memory.
impl PageSink for Vec<Canvas> {
    fn write_page(
        &mut self,
        _page_index: usize,
        page: Canvas,
    ) -> Result<Option<PathBuf>, TileSheetError> {
        self.push(page);
        Ok(None)
    }
}

/// Writes `<prefix><page_index>.png`.
#[derive(Debug, Clone)]
pub struct PngPageWriter {
    prefix: String,
}

impl PngPageWriter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn page_path(&self, page_index: usize) -> PathBuf {
        PathBuf::from(format!("{}{}.png", self.prefix, page_index))
    }
}

impl PageSink for PngPageWriter {
    fn write_page(
        &mut self,
        page_index: usize,
        page: Canvas,
    ) -> Result<Option<PathBuf>, TileSheetError> {
        let path = self.page_path(page_index);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        codec::encode_png(&page, &path)?;
        Ok(Some(path))
    }
}

/// Resolves manifest asset names to pixels.
pub trait AssetSource: Sync {
    fn decode(&self, asset: &str) -> Result<Canvas, TileSheetError>;
}

/// Files on disk (or `data:` URIs). Relative paths resolve against `root`
/// when one is set, otherwise against the working directory.
#[derive(Debug, Clone, Default)]
pub struct FileAssets {
    root: Option<PathBuf>,
}

impl FileAssets {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn resolve(&self, asset: &str) -> String {
        match &self.root {
            Some(root) if !asset.starts_with("data:") && Path::new(asset).is_relative() => {
                root.join(asset).to_string_lossy().into_owned()
            }
            _ => asset.to_string(),
        }
    }
}

impl AssetSource for FileAssets {
    fn decode(&self, asset: &str) -> Result<Canvas, TileSheetError> {
        codec::decode_source(&self.resolve(asset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    pub page_size: Size,
    pub gap: GapSize,
    /// Skip rows whose asset cannot be decoded instead of failing the run.
    pub skip_missing_assets: bool,
    pub parallel_pages: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            page_size: Size::a4_300dpi(),
            gap: GapSize::uniform(4),
            skip_missing_assets: false,
            parallel_pages: false,
        }
    }
}

/// The page being filled.
#[derive(Debug, Clone)]
pub struct PageState {
    pub page_index: usize,
    pub slot: usize,
    pub canvas: Canvas,
}

impl PageState {
    fn new(page_index: usize, size: Size) -> Self {
        Self {
            page_index,
            slot: 0,
            canvas: blank_page(size),
        }
    }
}

fn blank_page(size: Size) -> Canvas {
    Grid::filled(size.width as usize, size.height as usize, PAGE_BACKGROUND)
}

/// Optional trace and timing outputs threaded through a run.
#[derive(Clone, Copy, Default)]
pub(crate) struct Instruments<'a> {
    pub debug: Option<&'a DebugLogger>,
    pub perf: Option<&'a PerfLogger>,
}

pub fn pack(
    manifest: &TabularManifest,
    options: &PackOptions,
    assets: &dyn AssetSource,
    sink: &mut dyn PageSink,
) -> Result<PackMetrics, TileSheetError> {
    pack_instrumented(manifest, options, assets, sink, Instruments::default())
}

pub(crate) fn pack_instrumented(
    manifest: &TabularManifest,
    options: &PackOptions,
    assets: &dyn AssetSource,
    sink: &mut dyn PageSink,
    instruments: Instruments<'_>,
) -> Result<PackMetrics, TileSheetError> {
    let run = SpanTimer::start();
    let (entries, issues) = pack_entries(manifest);
    let mut metrics = PackMetrics::default();
    for issue in issues {
        skip_row(&mut metrics, instruments, issue);
    }
    if entries.is_empty() {
        info!("manifest has no placeable rows; no pages written");
        return Ok(metrics);
    }

    let sizing = SpanTimer::start();
    let (loaded, largest) = load_assets(entries, options, assets, &mut metrics, instruments)?;
    sizing.finish(instruments.perf, "pack.sizing", None);
    if loaded.is_empty() {
        return Err(TileSheetError::DegenerateLayout(
            "no manifest asset could be decoded".to_string(),
        ));
    }
    let geometry = PackGeometry::compute(options.page_size, largest, options.gap)?;
    debug!(
        "pack geometry: cell={}x{} grid={}x{} offset=({}, {})",
        geometry.cell.width,
        geometry.cell.height,
        geometry.columns,
        geometry.rows,
        geometry.offset.x,
        geometry.offset.y
    );
    metrics.geometry = Some(geometry);

    if options.parallel_pages {
        place_parallel(&loaded, options, &geometry, sink, &mut metrics, instruments)?;
    } else {
        place_streaming(&loaded, options, &geometry, sink, &mut metrics, instruments)?;
    }

    metrics.total_ms = run.finish(instruments.perf, "pack.total", None);
    if let Some(logger) = instruments.debug {
        logger.increment("pages.written", metrics.pages.len() as u64);
        logger.increment("items.placed", metrics.items as u64);
    }
    Ok(metrics)
}

fn skip_row(metrics: &mut PackMetrics, instruments: Instruments<'_>, issue: RowIssue) {
    warn!("skipping {}", TileSheetError::from(issue.clone()));
    if let Some(logger) = instruments.debug {
        logger.event(
            "manifest.skip",
            &[("row", issue.row.into()), ("reason", issue.reason.as_str().into())],
        );
        logger.increment("rows.skipped", 1);
    }
    metrics.skipped_rows.push(issue);
}

/// Handles an asset failure: skipped rows are recorded, otherwise the error
/// is returned with the row attached.
fn asset_failure(
    err: TileSheetError,
    entry: &PackEntry,
    options: &PackOptions,
    metrics: &mut PackMetrics,
    instruments: Instruments<'_>,
) -> Result<(), TileSheetError> {
    let err = err.at_row(entry.row);
    if !options.skip_missing_assets {
        return Err(err);
    }
    skip_row(
        metrics,
        instruments,
        RowIssue {
            row: entry.row,
            reason: err.to_string(),
        },
    );
    Ok(())
}

/// A manifest row together with its decoded asset.
struct LoadedAsset {
    entry: PackEntry,
    image: Canvas,
}

fn load_assets(
    entries: Vec<PackEntry>,
    options: &PackOptions,
    assets: &dyn AssetSource,
    metrics: &mut PackMetrics,
    instruments: Instruments<'_>,
) -> Result<(Vec<LoadedAsset>, Size), TileSheetError> {
    let mut largest = Size::new(0, 0);
    let mut loaded = Vec::with_capacity(entries.len());
    for entry in entries {
        match assets.decode(&entry.asset) {
            Ok(image) => {
                largest.width = largest.width.max(image.width() as u32);
                largest.height = largest.height.max(image.height() as u32);
                loaded.push(LoadedAsset { entry, image });
            }
            Err(err) => asset_failure(err, &entry, options, metrics, instruments)?,
        }
    }
    Ok((loaded, largest))
}

/// Draws `image` centered in slot `slot`, framed by the margin fill.
fn place_asset(canvas: &mut Canvas, geometry: &PackGeometry, gap: GapSize, slot: usize, image: &Canvas) {
    let border = GapSize::new(gap.x / 2, gap.y / 2);
    let footprint_w = image.width() as i64 + 2 * border.x as i64;
    let footprint_h = image.height() as i64 + 2 * border.y as i64;
    let inset = Point::new(
        ((geometry.cell.width as i64 - footprint_w) / 2).max(0),
        ((geometry.cell.height as i64 - footprint_h) / 2).max(0),
    );
    let at = geometry.slot_origin(slot) + inset;
    blit_with_border(image, canvas, at, border, Color::MARGIN_FILL);
}

fn flush_page(
    state: PageState,
    sink: &mut dyn PageSink,
    metrics: &mut PackMetrics,
    instruments: Instruments<'_>,
) -> Result<(), TileSheetError> {
    let PageState {
        page_index,
        slot,
        canvas,
    } = state;
    let encode = SpanTimer::start();
    let output = sink.write_page(page_index, canvas)?;
    let render_ms = encode.finish(instruments.perf, "page.encode", Some(page_index));
    let file = output
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    info!("page {page_index}: {slot} items {file}");
    if let Some(logger) = instruments.debug {
        logger.event(
            "page.flush",
            &[
                ("page", page_index.into()),
                ("items", slot.into()),
                ("file", file.as_str().into()),
            ],
        );
    }
    metrics.pages.push(PageMetrics {
        page_index,
        items: slot,
        output,
        render_ms,
    });
    Ok(())
}

fn place_streaming(
    loaded: &[LoadedAsset],
    options: &PackOptions,
    geometry: &PackGeometry,
    sink: &mut dyn PageSink,
    metrics: &mut PackMetrics,
    instruments: Instruments<'_>,
) -> Result<(), TileSheetError> {
    let placement = SpanTimer::start();
    let capacity = geometry.capacity();
    let mut next_page = 0;
    // Allocated on the first placement so a page that fills exactly is not
    // followed by an unused blank one.
    let mut current: Option<PageState> = None;
    for asset in loaded {
        for _ in 0..asset.entry.count {
            let state = current.get_or_insert_with(|| {
                let state = PageState::new(next_page, options.page_size);
                next_page += 1;
                state
            });
            place_asset(&mut state.canvas, geometry, options.gap, state.slot, &asset.image);
            state.slot += 1;
            metrics.items += 1;
            if state.slot >= capacity {
                if let Some(full) = current.take() {
                    flush_page(full, sink, metrics, instruments)?;
                }
            }
        }
    }
    if let Some(partial) = current {
        flush_page(partial, sink, metrics, instruments)?;
    }
    placement.finish(instruments.perf, "pack.placement", None);
    Ok(())
}

/// Placements for one page: `(asset index, slot)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePlan {
    pub page_index: usize,
    pub placements: Vec<(usize, usize)>,
}

/// Splits `counts` (instances per asset, in manifest order) into pages of
/// `capacity` slots.
pub fn plan_pages(counts: &[usize], capacity: usize) -> Vec<PagePlan> {
    let mut plans = Vec::new();
    if capacity == 0 {
        return plans;
    }
    let mut current = PagePlan::default();
    for (asset, count) in counts.iter().enumerate() {
        for _ in 0..*count {
            let slot = current.placements.len();
            current.placements.push((asset, slot));
            if current.placements.len() == capacity {
                let next = PagePlan {
                    page_index: current.page_index + 1,
                    placements: Vec::new(),
                };
                plans.push(std::mem::replace(&mut current, next));
            }
        }
    }
    if !current.placements.is_empty() {
        plans.push(current);
    }
    plans
}

/// Renders pages on the rayon pool, one batch of `current_num_threads()`
/// pages at a time. Each batch reaches the sink in page order before the
/// next one is rendered.
fn place_parallel(
    loaded: &[LoadedAsset],
    options: &PackOptions,
    geometry: &PackGeometry,
    sink: &mut dyn PageSink,
    metrics: &mut PackMetrics,
    instruments: Instruments<'_>,
) -> Result<(), TileSheetError> {
    use rayon::prelude::*;

    let placement = SpanTimer::start();
    let counts: Vec<usize> = loaded.iter().map(|asset| asset.entry.count).collect();
    let plans = plan_pages(&counts, geometry.capacity());
    let batch = rayon::current_num_threads().max(1);
    for chunk in plans.chunks(batch) {
        let pages: Vec<Canvas> = chunk
            .par_iter()
            .map(|plan| {
                let mut canvas = blank_page(options.page_size);
                for (asset, slot) in &plan.placements {
                    place_asset(&mut canvas, geometry, options.gap, *slot, &loaded[*asset].image);
                }
                canvas
            })
            .collect();
        for (plan, canvas) in chunk.iter().zip(pages) {
            metrics.items += plan.placements.len();
            let state = PageState {
                page_index: plan.page_index,
                slot: plan.placements.len(),
                canvas,
            };
            flush_page(state, sink, metrics, instruments)?;
        }
    }
    placement.finish(instruments.perf, "pack.placement", None);
    Ok(())
}
