//! Where a laid-out block starts on the page

use crate::config::{LayoutConfig, Margins};
use crate::layout::LayoutResult;
use serde::Serialize;

/// Top-left corner of a block, in mm from the page's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Origin {
    pub x: f32,
    pub y: f32,
}

/// Start x for a block `block_width_mm` wide: centered in the content width,
/// then clamped so it never starts left of the left margin or runs past the
/// right one (left wins when the block is wider than the content).
pub fn origin_x(block_width_mm: f32, page_width_mm: f32, margins: &Margins) -> f32 {
    let content_width = page_width_mm - margins.horizontal();
    let centered = margins.left + (content_width - block_width_mm) / 2.0;
    let max_x = page_width_mm - margins.right - block_width_mm;
    centered.min(max_x).max(margins.left)
}

/// Start y for a block `total_height_mm` tall with `line_count` lines.
///
/// Short blocks sit above geometric center (`short_block_ratio`); taller ones
/// use `long_block_ratio`. The result never starts above the top margin and
/// never pushes the block past the bottom margin unless it cannot fit at all.
pub fn origin_y(
    total_height_mm: f32,
    line_count: usize,
    page_height_mm: f32,
    margins: &Margins,
    config: &LayoutConfig,
) -> f32 {
    let available = page_height_mm - margins.vertical();
    let ratio = config.centering_ratio(line_count);
    let y = margins.top + (available - total_height_mm) * ratio;
    let max_y = page_height_mm - margins.bottom - total_height_mm;
    y.min(max_y).max(margins.top)
}

/// Drawing origin for a whole layout result.
pub fn placement_origin(
    result: &LayoutResult,
    page_width_mm: f32,
    page_height_mm: f32,
    margins: &Margins,
    config: &LayoutConfig,
) -> Origin {
    let origin = Origin {
        x: origin_x(result.width_mm, page_width_mm, margins),
        y: origin_y(
            result.total_height_mm,
            result.lines.len(),
            page_height_mm,
            margins,
            config,
        ),
    };
    log::debug!(
        "block {:.1} x {:.1} mm placed at ({:.1}, {:.1})",
        result.width_mm,
        result.total_height_mm,
        origin.x,
        origin.y
    );
    origin
}
