use crate::layout::packer::PackGeometry;
use crate::manifest::RowIssue;
use crate::types::Size;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    pub page_index: usize,
    pub items: usize,
    /// Where the sink put the page, if it wrote one.
    pub output: Option<PathBuf>,
    pub render_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PackMetrics {
    pub pages: Vec<PageMetrics>,
    pub items: usize,
    pub skipped_rows: Vec<RowIssue>,
    pub geometry: Option<PackGeometry>,
    pub total_ms: f64,
}

impl PackMetrics {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GridMetrics {
    /// Cells drawn onto the canvas.
    pub cells: usize,
    pub cell_size: Option<Size>,
    pub columns: usize,
    pub rows: usize,
    pub render_ms: f64,
}
