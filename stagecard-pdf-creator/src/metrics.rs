//! Text measurement port
//!
//! The layout core never talks to a font directly. It asks a [`TextMetrics`]
//! implementation for widths and vertical scales, so the same fitting code runs
//! against `fontdue` in production and a fixed-advance fake in tests.

pub use crate::config::VerticalSource;
use crate::config::{LayoutConfig, PT_TO_MM};

/// Vertical scale for one font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Glyph height in font units divided by units-per-em.
    pub scale: f32,
    pub source: VerticalSource,
}

impl FontMetrics {
    pub fn fallback(config: &LayoutConfig) -> Self {
        Self {
            scale: config.fallback_vertical_scale,
            source: VerticalSource::Fallback,
        }
    }
}

/// Measurement backend consumed by the solver and layout engine.
///
/// Implementations may keep per-call scratch state (current size, spacing) but
/// must leave it as they found it when a call returns.
pub trait TextMetrics {
    /// Width of `text` at `font_size_pt`, in mm. Must be non-decreasing in
    /// `font_size_pt` for fixed text.
    fn measure_width(&mut self, text: &str, font_size_pt: u32) -> f32;

    /// Vertical scale at `font_size_pt` from the first of `sources` the font
    /// can answer, or `None` when none of them is usable.
    fn vertical_metrics(
        &mut self,
        font_size_pt: u32,
        sources: &[VerticalSource],
    ) -> Option<FontMetrics>;
}

/// Query the port in the configured source order, substituting the fallback
/// scale when it has nothing (or nothing sane) to report.
pub fn resolve_vertical(
    metrics: &mut dyn TextMetrics,
    font_size_pt: u32,
    config: &LayoutConfig,
) -> FontMetrics {
    match metrics.vertical_metrics(font_size_pt, &config.vertical_sources) {
        Some(m) if m.scale.is_finite() && m.scale > 0.0 => m,
        _ => FontMetrics::fallback(config),
    }
}

/// Physical height of one line at `font_size_pt` with vertical `scale`,
/// including the fixed leading.
pub fn line_height_mm(font_size_pt: u32, scale: f32, config: &LayoutConfig) -> f32 {
    font_size_pt as f32 * PT_TO_MM * scale * config.line_height_safety + config.leading_mm
}

/// Largest font size whose single line fits in `available_mm`, ignoring
/// the `[font_min, font_max]` range.
pub fn font_for_height(available_mm: f32, scale: f32, config: &LayoutConfig) -> u32 {
    let per_point = PT_TO_MM * scale * config.line_height_safety;
    let room = available_mm - config.leading_mm;
    if room <= 0.0 || per_point <= 0.0 {
        return 0;
    }
    (room / per_point).floor() as u32
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Deterministic fixed-advance metrics for tests.

    use super::*;

    /// Every character advances `advance_em` of the font size. `scale` answers
    /// `BBox` queries and `line_scale` answers `AscentDescent` ones.
    #[derive(Debug, Clone)]
    pub struct FixedAdvanceMetrics {
        pub advance_em: f32,
        pub scale: Option<f32>,
        pub line_scale: Option<f32>,
        pub calls: usize,
    }

    impl FixedAdvanceMetrics {
        pub fn new() -> Self {
            Self {
                advance_em: 0.6,
                scale: Some(0.92),
                line_scale: Some(0.8),
                calls: 0,
            }
        }

        pub fn without_vertical_metrics() -> Self {
            Self {
                scale: None,
                line_scale: None,
                ..Self::new()
            }
        }
    }

    impl TextMetrics for FixedAdvanceMetrics {
        fn measure_width(&mut self, text: &str, font_size_pt: u32) -> f32 {
            self.calls += 1;
            text.chars().count() as f32 * self.advance_em * font_size_pt as f32 * PT_TO_MM
        }

        fn vertical_metrics(
            &mut self,
            _font_size_pt: u32,
            sources: &[VerticalSource],
        ) -> Option<FontMetrics> {
            sources.iter().find_map(|&source| {
                let scale = match source {
                    VerticalSource::BBox => self.scale,
                    VerticalSource::AscentDescent => self.line_scale,
                    VerticalSource::Fallback => None,
                };
                scale.map(|scale| FontMetrics { scale, source })
            })
        }
    }
}
