//! Font loading and measurement for sign text
//!
//! Wraps one display font with `fontdue` for advance widths, kerning and
//! line metrics, and reads its global glyph bounding box with `ttf-parser`.
//! [`FontContext`] is the production [`TextMetrics`] backend.

use crate::config::{VerticalSource, PT_TO_MM};
use crate::metrics::{FontMetrics, TextMetrics};
use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::path::Path;

/// WinAnsi code points 0x80..=0x9F; `None` marks unassigned codes.
#[rustfmt::skip]
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// Character drawn for anything WinAnsi cannot encode.
pub const REPLACEMENT_CHAR: char = '?';

/// WinAnsi byte for `ch`, if it has one.
pub fn win_ansi_byte(ch: char) -> Option<u8> {
    match ch as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(ch as u32 as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|c| *c == Some(ch))
            .map(|i| 0x80 + i as u8),
    }
}

/// Character for WinAnsi byte `code`, if assigned.
pub fn win_ansi_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as char),
        0x80..=0x9F => WIN_ANSI_HIGH[(code - 0x80) as usize],
        _ => None,
    }
}

/// The character that will actually be drawn for `ch`.
pub fn drawable_char(ch: char) -> char {
    if win_ansi_byte(ch).is_some() {
        ch
    } else {
        REPLACEMENT_CHAR
    }
}

/// A loaded display font plus the measurement state the layout core drives.
#[derive(Clone)]
pub struct FontContext {
    pub font: Font,
    pub font_name: String,
    pub font_path: String,
    /// Raw font bytes, kept for embedding into the PDF.
    pub font_data: Vec<u8>,

    /// Size used by `current_text_width`, in points. Scratch state.
    current_size_pt: f32,
    /// Extra spacing between characters, in 1/1000 em.
    pub tracking: f32,

    /// Global bbox height / units-per-em, if the `head` table is sane.
    bbox_scale: Option<f32>,
    /// Advance widths per point of font size.
    advance_cache: HashMap<char, f32>,
}

impl FontContext {
    /// Load the first display font found on this machine.
    ///
    /// `STAGECARD_FONT` names a TrueType file that takes priority over the
    /// system list.
    pub fn initialize_fonts() -> Result<Self> {
        if let Ok(path) = std::env::var("STAGECARD_FONT") {
            let name = Path::new(&path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Custom".to_string());
            return Self::from_file(&name, &path);
        }

        let font_paths = vec![
            // Linux packaged bold sans fallbacks.
            ("DejaVu Sans Bold", "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
            ("Liberation Sans Bold", "/usr/share/fonts/truetype/liberation2/LiberationSans-Bold.ttf"),
            ("Liberation Sans Bold", "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf"),
            // Windows.
            ("Impact", "C:\\Windows\\Fonts\\impact.ttf"),
            ("Arial Bold", "C:\\Windows\\Fonts\\arialbd.ttf"),
            // macOS.
            ("Arial Bold", "/Library/Fonts/Arial Bold.ttf"),
            ("Arial Bold", "/System/Library/Fonts/Supplemental/Arial Bold.ttf"),
        ];

        for (font_name, font_path) in font_paths {
            if Path::new(font_path).exists() {
                return Self::from_file(font_name, font_path);
            }
        }

        Err(anyhow!("No suitable display font found"))
    }

    /// Load a TrueType font from disk.
    pub fn from_file(font_name: &str, font_path: impl AsRef<Path>) -> Result<Self> {
        let path = font_path.as_ref();
        log::info!("Loading font: {} from {}", font_name, path.display());
        let font_data = std::fs::read(path)
            .with_context(|| format!("Failed to read font file {}", path.display()))?;
        let mut context = Self::from_bytes(font_name, font_data)?;
        context.font_path = path.display().to_string();
        Ok(context)
    }

    /// Load a TrueType font from memory.
    pub fn from_bytes(font_name: &str, font_data: Vec<u8>) -> Result<Self> {
        let font = Font::from_bytes(font_data.as_slice(), FontSettings::default())
            .map_err(|e| anyhow!("Failed to load font {}: {}", font_name, e))?;
        let bbox_scale = Self::read_bbox_scale(&font_data);
        if bbox_scale.is_none() {
            log::warn!("{} has no usable glyph bounding box", font_name);
        }

        Ok(FontContext {
            font,
            font_name: font_name.to_string(),
            font_path: String::new(),
            font_data,
            current_size_pt: 12.0,
            tracking: 0.0,
            bbox_scale,
            advance_cache: HashMap::new(),
        })
    }

    fn read_bbox_scale(font_data: &[u8]) -> Option<f32> {
        let face = ttf_parser::Face::parse(font_data, 0).ok()?;
        let bbox = face.global_bounding_box();
        let height = f32::from(bbox.y_max) - f32::from(bbox.y_min);
        let units_per_em = f32::from(face.units_per_em());
        if height > 0.0 && units_per_em > 0.0 {
            Some(height / units_per_em)
        } else {
            None
        }
    }

    pub fn current_size_pt(&self) -> f32 {
        self.current_size_pt
    }

    /// Run `f` with the current size set to `size_pt`, restoring the previous
    /// size afterwards.
    pub fn with_font_size<R>(&mut self, size_pt: f32, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.current_size_pt, size_pt);
        let out = f(self);
        self.current_size_pt = previous;
        out
    }

    /// Advance width of `ch` at 1 pt.
    fn unit_advance(&mut self, ch: char) -> f32 {
        let font = &self.font;
        *self
            .advance_cache
            .entry(ch)
            .or_insert_with(|| font.metrics(ch, 1000.0).advance_width / 1000.0)
    }

    /// Width of `text` at the current size, in points, with kerning and tracking.
    pub fn current_text_width(&mut self, text: &str) -> f32 {
        let size = self.current_size_pt;
        let chars: Vec<char> = text.chars().map(drawable_char).collect();
        if chars.is_empty() {
            return 0.0;
        }

        let mut width = 0.0;
        for (i, &ch) in chars.iter().enumerate() {
            width += self.unit_advance(ch) * size;

            if let Some(&next) = chars.get(i + 1) {
                if let Some(kern) = self.font.horizontal_kern(ch, next, size) {
                    width += kern;
                }
                width += (self.tracking / 1000.0) * size;
            }
        }
        width
    }

    /// Advance width of WinAnsi `code` in 1/1000 em, as PDF `Widths` expects.
    pub fn pdf_width(&mut self, code: u8) -> f32 {
        match win_ansi_char(code) {
            Some(ch) => self.unit_advance(ch) * 1000.0,
            None => 0.0,
        }
    }

    /// Ascent and descent (negative) at `size_pt`, in points.
    pub fn ascent_descent(&self, size_pt: f32) -> Option<(f32, f32)> {
        self.font
            .horizontal_line_metrics(size_pt)
            .map(|lm| (lm.ascent, lm.descent))
    }
}

impl TextMetrics for FontContext {
    fn measure_width(&mut self, text: &str, font_size_pt: u32) -> f32 {
        self.with_font_size(font_size_pt as f32, |ctx| ctx.current_text_width(text)) * PT_TO_MM
    }

    fn vertical_metrics(
        &mut self,
        font_size_pt: u32,
        sources: &[VerticalSource],
    ) -> Option<FontMetrics> {
        let size = font_size_pt as f32;
        for &source in sources {
            let scale = match source {
                VerticalSource::BBox => self.bbox_scale,
                VerticalSource::AscentDescent => self
                    .ascent_descent(size)
                    .map(|(ascent, descent)| (ascent - descent) / size)
                    .filter(|s| *s > 0.0),
                VerticalSource::Fallback => None,
            };
            if let Some(scale) = scale {
                return Some(FontMetrics { scale, source });
            }
        }
        None
    }
}

/// Initialize the display font for the sign creator
pub fn initialize_fonts() -> Result<FontContext> {
    FontContext::initialize_fonts()
}
