//! Layout tunables, page presets and margins
//!
//! Every constant the fitting core consults lives on [`LayoutConfig`] so a host
//! can override it (typically from JSON) without touching code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 1 inch in millimetres.
pub const IN_TO_MM: f32 = 25.4;

/// 1 typographic point (1/72 inch) in millimetres.
pub const PT_TO_MM: f32 = 0.352778;

/// Where a vertical scale for a font size may come from, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalSource {
    /// Global glyph bounding box of the font (`head` table).
    BBox,
    /// Ascent minus descent from the horizontal line metrics.
    AscentDescent,
    /// Fixed conservative scale, used when nothing else is available.
    Fallback,
}

/// What to do when the fitted block is taller than the available height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OverflowStrategy {
    /// Scale the main font once by `available / total`.
    SingleShot,
    /// Scale repeatedly, shrinking the ratio by `safety_margin` each round,
    /// until the block fits, fonts stop changing or `max_rounds` is reached.
    Iterative { max_rounds: u32, safety_margin: f32 },
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const fn uniform(mm: f32) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl Default for Margins {
    /// 1 cm on every side.
    fn default() -> Self {
        Self::uniform(10.0)
    }
}

/// Physical page size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageSize {
    /// 11x17 in landscape, the stage card format.
    pub const TABLOID_LANDSCAPE: PageSize = PageSize {
        width_mm: 17.0 * IN_TO_MM,
        height_mm: 11.0 * IN_TO_MM,
    };
    pub const LETTER_LANDSCAPE: PageSize = PageSize {
        width_mm: 11.0 * IN_TO_MM,
        height_mm: 8.5 * IN_TO_MM,
    };
    pub const A4_LANDSCAPE: PageSize = PageSize {
        width_mm: 297.0,
        height_mm: 210.0,
    };

    pub const fn new(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::TABLOID_LANDSCAPE
    }
}

/// Tunables for segmentation, font-size search, block layout and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Smallest font size the solver will return, in points.
    pub font_min_pt: u32,
    /// Largest font size the solver will return, in points.
    pub font_max_pt: u32,
    /// Stride of the coarse scan before binary refinement.
    pub font_step_pt: u32,
    /// Fixed extra spacing added below every line, in mm.
    pub leading_mm: f32,
    /// Multiplier (>= 1) on the glyph height to absorb overshoot.
    pub line_height_safety: f32,
    pub connector_font_ratio: f32,
    pub connector_font_min_pt: u32,
    pub max_words_per_line: usize,
    /// Words rendered small on their own line. Matched case-insensitively.
    pub connector_words: Vec<String>,
    /// Leading articles demoted to connector size when more words follow.
    pub lead_in_words: Vec<String>,
    /// Split off lead-ins and chunk long main segments.
    pub expand_segments: bool,
    /// Vertical centering ratio for blocks of at most `short_block_max_lines`.
    pub short_block_ratio: f32,
    /// Vertical centering ratio for taller blocks.
    pub long_block_ratio: f32,
    pub short_block_max_lines: usize,
    /// Vertical scale used when the font reports no usable metrics.
    pub fallback_vertical_scale: f32,
    /// Preference order for vertical metrics; `Fallback` is always implied last.
    pub vertical_sources: Vec<VerticalSource>,
    /// Width bounds at or below zero are clamped up to this, in mm.
    pub min_width_mm: f32,
    pub overflow: OverflowStrategy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_min_pt: 12,
            font_max_pt: 400,
            font_step_pt: 8,
            leading_mm: 5.0,
            line_height_safety: 1.05,
            connector_font_ratio: 0.55,
            connector_font_min_pt: 24,
            max_words_per_line: 3,
            connector_words: ["and", "&", "with", "featuring", "presents"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            lead_in_words: ["the", "a", "an"].iter().map(|w| w.to_string()).collect(),
            expand_segments: true,
            short_block_ratio: 0.4,
            long_block_ratio: 0.5,
            short_block_max_lines: 2,
            fallback_vertical_scale: 0.92,
            vertical_sources: vec![VerticalSource::BBox, VerticalSource::AscentDescent],
            min_width_mm: 1.0,
            overflow: OverflowStrategy::Iterative {
                max_rounds: 8,
                safety_margin: 0.01,
            },
        }
    }
}

impl LayoutConfig {
    /// Parse a (possibly partial) JSON object; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LayoutConfig =
            serde_json::from_str(json).context("invalid layout configuration JSON")?;
        Ok(config.validated())
    }

    /// Clamp tunables into ranges the solver and layout engine can work with.
    pub fn validated(mut self) -> Self {
        self.font_min_pt = self.font_min_pt.max(1);
        if self.font_max_pt < self.font_min_pt {
            log::warn!(
                "font_max_pt {} below font_min_pt {}, raising it",
                self.font_max_pt,
                self.font_min_pt
            );
            self.font_max_pt = self.font_min_pt;
        }
        self.font_step_pt = self.font_step_pt.max(1);
        self.leading_mm = self.leading_mm.max(0.0);
        self.line_height_safety = self.line_height_safety.max(1.0);
        if self.connector_font_ratio.is_nan()
            || self.connector_font_ratio <= 0.0
            || self.connector_font_ratio > 1.0
        {
            self.connector_font_ratio = 0.55;
        }
        self.max_words_per_line = self.max_words_per_line.max(1);
        self.short_block_ratio = self.short_block_ratio.clamp(0.0, 1.0);
        self.long_block_ratio = self.long_block_ratio.clamp(0.0, 1.0);
        if self.fallback_vertical_scale.is_nan() || self.fallback_vertical_scale <= 0.0 {
            self.fallback_vertical_scale = 0.92;
        }
        if self.min_width_mm.is_nan() || self.min_width_mm <= 0.0 {
            self.min_width_mm = 1.0;
        }
        if let OverflowStrategy::Iterative {
            max_rounds,
            safety_margin,
        } = self.overflow
        {
            self.overflow = OverflowStrategy::Iterative {
                max_rounds: max_rounds.max(1),
                safety_margin: safety_margin.clamp(0.0, 0.5),
            };
        }
        self
    }

    /// Clamp a font size into `[font_min_pt, font_max_pt]`.
    pub fn clamp_font(&self, size: u32) -> u32 {
        size.clamp(self.font_min_pt, self.font_max_pt)
    }

    pub fn is_connector_word(&self, word: &str) -> bool {
        word == "&"
            || self
                .connector_words
                .iter()
                .any(|c| c.to_lowercase() == word.to_lowercase())
    }

    pub fn is_lead_in_word(&self, word: &str) -> bool {
        self.lead_in_words
            .iter()
            .any(|l| l.to_lowercase() == word.to_lowercase())
    }

    /// Centering ratio for a block with `line_count` lines.
    pub fn centering_ratio(&self, line_count: usize) -> f32 {
        if line_count <= self.short_block_max_lines {
            self.short_block_ratio
        } else {
            self.long_block_ratio
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = LayoutConfig::from_json_str(r#"{"font_max_pt": 300, "leading_mm": 3.5}"#)
            .unwrap();
        assert_eq!(config.font_max_pt, 300);
        assert_eq!(config.leading_mm, 3.5);
        assert_eq!(config.font_min_pt, LayoutConfig::default().font_min_pt);
        assert_eq!(config.max_words_per_line, 3);
    }

    #[test]
    fn overflow_strategy_round_trips_through_json() {
        let config =
            LayoutConfig::from_json_str(r#"{"overflow": "SingleShot"}"#).unwrap();
        assert_eq!(config.overflow, OverflowStrategy::SingleShot);

        let json = serde_json::to_string(&LayoutConfig::default()).unwrap();
        assert_eq!(
            LayoutConfig::from_json_str(&json).unwrap(),
            LayoutConfig::default()
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(LayoutConfig::from_json_str("{font_min_pt: }").is_err());
    }

    #[test]
    fn validated_repairs_inverted_range_and_zero_step() {
        let config = LayoutConfig {
            font_min_pt: 80,
            font_max_pt: 40,
            font_step_pt: 0,
            ..LayoutConfig::default()
        }
        .validated();
        assert_eq!(config.font_max_pt, 80);
        assert_eq!(config.font_step_pt, 1);
    }

    #[test]
    fn connector_matching_is_case_insensitive() {
        let config = LayoutConfig::default();
        assert!(config.is_connector_word("AND"));
        assert!(config.is_connector_word("Featuring"));
        assert!(config.is_connector_word("&"));
        assert!(!config.is_connector_word("andy"));
        assert!(config.is_lead_in_word("The"));
    }

    #[test]
    fn tabloid_is_eleven_by_seventeen() {
        let page = PageSize::TABLOID_LANDSCAPE;
        assert!((page.width_mm - 431.8).abs() < 1e-3);
        assert!((page.height_mm - 279.4).abs() < 1e-3);
    }
}
