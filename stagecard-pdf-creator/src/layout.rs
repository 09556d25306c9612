//! Block layout: one display name to a stack of sized lines
//!
//! Main segments share one font size (the smallest any of them needs to fit
//! the width), connector segments get a reduced size derived from it, and the
//! whole block is scaled down if it is taller than the page allows.

use crate::config::{LayoutConfig, Margins, OverflowStrategy};
use crate::metrics::{self, TextMetrics, VerticalSource};
use crate::segmenter::{self, Role, Segment};
use crate::solver::max_font_for_width;
use serde::Serialize;

/// One rendered line of a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub text: String,
    pub font_size_pt: u32,
    pub role: Role,
    /// Measured width at `font_size_pt`, in mm.
    pub width_mm: f32,
    /// Physical line height including leading, in mm.
    pub height_mm: f32,
}

/// Non-fatal conditions met while laying out a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    /// The metrics port had no vertical metrics; the fallback scale was used.
    MetricsUnavailable { font_size_pt: u32 },
    /// The block is taller than the available height even after scaling down.
    Overflow {
        total_height_mm: f32,
        available_height_mm: f32,
    },
}

/// Lines top to bottom plus the block's physical extent.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LayoutResult {
    pub lines: Vec<Line>,
    pub total_height_mm: f32,
    /// Width of the widest line, in mm.
    pub width_mm: f32,
    pub diagnostics: Vec<Diagnostic>,
}

impl LayoutResult {
    /// Result for blank input: nothing to render.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn overflowed(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Overflow { .. }))
    }

    /// Font size shared by the main lines, if there are any.
    pub fn main_font_pt(&self) -> Option<u32> {
        self.lines
            .iter()
            .find(|l| l.role == Role::Main)
            .map(|l| l.font_size_pt)
    }

    fn from_lines(lines: Vec<Line>) -> Self {
        let total_height_mm = lines.iter().map(|l| l.height_mm).sum();
        let width_mm = lines.iter().map(|l| l.width_mm).fold(0.0, f32::max);
        Self {
            lines,
            total_height_mm,
            width_mm,
            diagnostics: Vec::new(),
        }
    }
}

/// Fits text blocks against a measurement backend.
pub struct BlockLayoutEngine<'a> {
    metrics: &'a mut dyn TextMetrics,
    config: &'a LayoutConfig,
    metrics_missing_at: Option<u32>,
}

impl<'a> BlockLayoutEngine<'a> {
    pub fn new(metrics: &'a mut dyn TextMetrics, config: &'a LayoutConfig) -> Self {
        Self {
            metrics,
            config,
            metrics_missing_at: None,
        }
    }

    /// Lay out `text` inside a `box_width_mm` x `box_height_mm` box less `margins`.
    pub fn layout(
        &mut self,
        text: &str,
        box_width_mm: f32,
        box_height_mm: f32,
        margins: &Margins,
    ) -> LayoutResult {
        self.metrics_missing_at = None;

        let mut segments = segmenter::segment(text, self.config);
        if segments.is_empty() {
            log::debug!("blank input, nothing to lay out");
            return LayoutResult::empty();
        }
        if self.config.expand_segments {
            segments = segmenter::expand(segments, self.config);
        }

        let available_width = (box_width_mm - margins.horizontal()).max(self.config.min_width_mm);
        let available_height = box_height_mm - margins.vertical();

        let mut result = match segments.as_slice() {
            [only] if only.role == Role::Main => {
                self.layout_single(only, available_width, available_height)
            }
            _ => self.layout_multi(&segments, available_width, available_height),
        };

        if let Some(font_size_pt) = self.metrics_missing_at {
            log::warn!(
                "no vertical metrics at {} pt, using fallback scale {}",
                font_size_pt,
                self.config.fallback_vertical_scale
            );
            result
                .diagnostics
                .push(Diagnostic::MetricsUnavailable { font_size_pt });
        }

        if result.total_height_mm > available_height {
            log::warn!(
                "{:?} overflows: {:.1} mm tall, {:.1} mm available",
                text,
                result.total_height_mm,
                available_height
            );
            result.diagnostics.push(Diagnostic::Overflow {
                total_height_mm: result.total_height_mm,
                available_height_mm: available_height,
            });
        }

        result
    }

    /// One main segment: fit width, cap by height, then step down until the
    /// line really fits.
    fn layout_single(
        &mut self,
        segment: &Segment,
        available_width: f32,
        available_height: f32,
    ) -> LayoutResult {
        let width_fit = max_font_for_width(self.metrics, &segment.text, available_width, self.config);
        let scale = self.vertical_scale(width_fit);
        let height_fit = metrics::font_for_height(available_height, scale, self.config);

        let mut size = self.config.clamp_font(width_fit.min(height_fit));
        while size > self.config.font_min_pt && self.line_height(size) > available_height {
            size -= 1;
        }

        log::debug!(
            "single line {:?}: width fit {} pt, height fit {} pt, using {} pt",
            segment.text,
            width_fit,
            height_fit,
            size
        );

        let line = self.build_line(segment, size);
        LayoutResult::from_lines(vec![line])
    }

    fn layout_multi(
        &mut self,
        segments: &[Segment],
        available_width: f32,
        available_height: f32,
    ) -> LayoutResult {
        let mut main_font = self.shared_main_font(segments, available_width);
        let mut result = self.build_block(segments, main_font, available_width);
        log::debug!(
            "block of {} lines at main {} pt: {:.1} mm tall, {:.1} mm available",
            result.lines.len(),
            main_font,
            result.total_height_mm,
            available_height
        );

        let (rounds, safety_margin) = match self.config.overflow {
            OverflowStrategy::SingleShot => (1, 0.0),
            OverflowStrategy::Iterative {
                max_rounds,
                safety_margin,
            } => (max_rounds, safety_margin),
        };

        for round in 0..rounds {
            if result.total_height_mm <= available_height || result.total_height_mm <= 0.0 {
                break;
            }
            let ratio = available_height.max(0.0) / result.total_height_mm * (1.0 - safety_margin);
            let scaled = self.config.clamp_font((main_font as f32 * ratio).floor() as u32);
            if scaled == main_font {
                log::debug!("scale-down round {} made no progress at {} pt", round + 1, main_font);
                break;
            }
            main_font = scaled;
            result = self.build_block(segments, main_font, available_width);
            log::debug!(
                "scale-down round {}: main {} pt, {:.1} mm tall",
                round + 1,
                main_font,
                result.total_height_mm
            );
        }

        result
    }

    /// Smallest width fit across main segments; every segment counts when the
    /// block has no main segment at all.
    fn shared_main_font(&mut self, segments: &[Segment], available_width: f32) -> u32 {
        let has_main = segments.iter().any(|s| s.role == Role::Main);
        segments
            .iter()
            .filter(|s| !has_main || s.role == Role::Main)
            .map(|s| max_font_for_width(self.metrics, &s.text, available_width, self.config))
            .min()
            .unwrap_or(self.config.font_min_pt)
    }

    /// `max(floor, round(main * ratio))`, never larger than the main font and
    /// never wider than the page.
    fn connector_font(&mut self, text: &str, main_font: u32, available_width: f32) -> u32 {
        let derived = ((main_font as f32 * self.config.connector_font_ratio).round() as u32)
            .max(self.config.connector_font_min_pt)
            .min(main_font);
        let size = self.config.clamp_font(derived);
        if self.metrics.measure_width(text, size) <= available_width {
            size
        } else {
            max_font_for_width(self.metrics, text, available_width, self.config).min(size)
        }
    }

    fn build_block(&mut self, segments: &[Segment], main_font: u32, available_width: f32) -> LayoutResult {
        let lines = segments
            .iter()
            .map(|seg| {
                let size = match seg.role {
                    Role::Main => main_font,
                    Role::Connector => self.connector_font(&seg.text, main_font, available_width),
                };
                self.build_line(seg, size)
            })
            .collect();
        LayoutResult::from_lines(lines)
    }

    fn build_line(&mut self, segment: &Segment, font_size_pt: u32) -> Line {
        Line {
            text: segment.text.clone(),
            font_size_pt,
            role: segment.role,
            width_mm: self.metrics.measure_width(&segment.text, font_size_pt),
            height_mm: self.line_height(font_size_pt),
        }
    }

    fn vertical_scale(&mut self, font_size_pt: u32) -> f32 {
        let fm = metrics::resolve_vertical(self.metrics, font_size_pt, self.config);
        if fm.source == VerticalSource::Fallback && self.metrics_missing_at.is_none() {
            self.metrics_missing_at = Some(font_size_pt);
        }
        fm.scale
    }

    fn line_height(&mut self, font_size_pt: u32) -> f32 {
        let scale = self.vertical_scale(font_size_pt);
        metrics::line_height_mm(font_size_pt, scale, self.config)
    }
}

/// Lay out `text` with a fresh engine.
pub fn layout(
    metrics: &mut dyn TextMetrics,
    text: &str,
    box_width_mm: f32,
    box_height_mm: f32,
    margins: &Margins,
    config: &LayoutConfig,
) -> LayoutResult {
    BlockLayoutEngine::new(metrics, config).layout(text, box_width_mm, box_height_mm, margins)
}
