//! Stage sign PDF generation
//!
//! Lays out one name, places the block on a landscape page and draws it line
//! by line into a single-page PDF whose embedded font is the one used for
//! measuring.

use crate::config::{LayoutConfig, Margins, PageSize, PT_TO_MM};
use crate::fonts::{drawable_char, win_ansi_byte, FontContext, REPLACEMENT_CHAR};
use crate::layout::{self, LayoutResult};
use crate::placement::{placement_origin, Origin};
use crate::segmenter::{normalize, Role};
use anyhow::{anyhow, Context, Result};
use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object, ObjectId, Stream, StringFormat,
};
use serde::{Deserialize, Serialize};

const FONT_RESOURCE: &str = "F1";

/// Horizontal alignment of a line inside its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One line cell handed to a [`RenderBackend`]. Coordinates are mm from the
/// page's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawLine<'a> {
    pub text: &'a str,
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
    pub font_size_pt: u32,
    pub align: Align,
    pub role: Role,
}

/// Something that can draw a line of text into a cell.
pub trait RenderBackend {
    fn draw_line(&mut self, line: &DrawLine<'_>) -> Result<()>;
}

/// Draw every line of `result` top to bottom, starting at `origin`.
pub fn render_block(
    backend: &mut dyn RenderBackend,
    result: &LayoutResult,
    origin: Origin,
) -> Result<()> {
    let mut y = origin.y;
    for line in &result.lines {
        backend.draw_line(&DrawLine {
            text: &line.text,
            x_mm: origin.x,
            y_mm: y,
            width_mm: result.width_mm,
            height_mm: line.height_mm,
            font_size_pt: line.font_size_pt,
            align: Align::Center,
            role: line.role,
        })?;
        y += line.height_mm;
    }
    Ok(())
}

/// Output file name for a sign: words joined by underscores, path separators dropped.
pub fn sign_file_name(text: &str) -> Option<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }
    let stem: String = normalized
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '\0'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}.pdf", stem))
}

/// Page and layout settings for sign generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignOptions {
    pub page: PageSize,
    pub margins: Margins,
    pub layout: LayoutConfig,
    /// Extra spacing between characters, in 1/1000 em. Applied to both
    /// measuring and drawing.
    pub tracking: f32,
    /// Stroke the page edge, the margin box and every line cell.
    pub debug_guides: bool,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            page: PageSize::TABLOID_LANDSCAPE,
            margins: Margins::default(),
            layout: LayoutConfig::default(),
            tracking: 0.0,
            debug_guides: false,
        }
    }
}

impl SignOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut options: SignOptions =
            serde_json::from_str(json).context("invalid sign options JSON")?;
        options.layout = options.layout.validated();
        Ok(options)
    }
}

/// What happened to one sign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignReport {
    pub text: String,
    /// `None` when the input was blank and nothing was written.
    pub output_path: Option<String>,
    pub line_count: usize,
    pub main_font_pt: Option<u32>,
    pub total_height_mm: f32,
    pub overflowed: bool,
}

/// Single-page sign PDF writer
pub struct SignPdfGenerator {
    font_context: FontContext,
    options: SignOptions,
    document: Document,
    content: Content,
    font_id: ObjectId,
    pages_id: ObjectId,
}

impl SignPdfGenerator {
    pub fn new(mut font_context: FontContext, options: SignOptions) -> Self {
        font_context.tracking = options.tracking;
        Self {
            font_context,
            options,
            document: Document::with_version("1.5"),
            content: Content {
                operations: Vec::new(),
            },
            font_id: (0, 0),  // Set in initialize_document
            pages_id: (0, 0), // Set in initialize_document
        }
    }

    pub fn options(&self) -> &SignOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: SignOptions) {
        self.font_context.tracking = options.tracking;
        self.options = options;
    }

    /// Lay out `text` for the configured page without drawing it.
    pub fn layout(&mut self, text: &str) -> LayoutResult {
        let page = self.options.page;
        layout::layout(
            &mut self.font_context,
            text,
            page.width_mm,
            page.height_mm,
            &self.options.margins,
            &self.options.layout,
        )
    }

    /// Lay out, draw and save one sign. Blank text writes nothing.
    pub fn generate_sign(&mut self, text: &str, output_path: &str) -> Result<SignReport> {
        let result = self.layout(text);
        if result.is_empty() {
            log::debug!("skipping blank sign text");
            return Ok(Self::report(text, None, &result));
        }

        let page = self.options.page;
        let origin = placement_origin(
            &result,
            page.width_mm,
            page.height_mm,
            &self.options.margins,
            &self.options.layout,
        );

        self.initialize_document()?;
        self.content.operations.clear();
        if self.options.debug_guides {
            self.add_debug_guides(&result, origin);
        }
        render_block(self, &result, origin)?;
        self.finish_page()?;
        self.save_document(output_path)?;

        log::info!(
            "Wrote {} ({} lines, main {:?} pt)",
            output_path,
            result.lines.len(),
            result.main_font_pt()
        );
        Ok(Self::report(text, Some(output_path.to_string()), &result))
    }

    fn report(text: &str, output_path: Option<String>, result: &LayoutResult) -> SignReport {
        SignReport {
            text: normalize(text),
            output_path,
            line_count: result.lines.len(),
            main_font_pt: result.main_font_pt(),
            total_height_mm: result.total_height_mm,
            overflowed: result.overflowed(),
        }
    }

    fn page_height_pt(&self) -> f32 {
        mm_to_pt(self.options.page.height_mm)
    }

    /// Fresh document with the font, an empty page tree and the catalog.
    fn initialize_document(&mut self) -> Result<()> {
        self.document = Document::with_version("1.5");
        self.font_id = self.add_font_to_document()?;

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Kids", Object::Array(vec![]));
        pages_dict.set("Count", Object::Integer(0));
        let pages_id = self.document.add_object(Object::Dictionary(pages_dict));

        let mut info_dict = Dictionary::new();
        info_dict.set("Producer", Object::string_literal("Stagecard PDF Creator"));
        info_dict.set("Creator", Object::string_literal("Stagecard"));
        let info_id = self.document.add_object(Object::Dictionary(info_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog_dict.set("Pages", Object::Reference(pages_id));
        let catalog_id = self.document.add_object(Object::Dictionary(catalog_dict));

        self.document.trailer.set("Root", Object::Reference(catalog_id));
        self.document.trailer.set("Info", Object::Reference(info_id));
        self.pages_id = pages_id;
        Ok(())
    }

    /// Simple TrueType font with WinAnsi widths taken from the measuring font.
    fn add_font_to_document(&mut self) -> Result<ObjectId> {
        let base_font = sanitize_pdf_font_name(&self.font_context.font_name);
        let (ascent, descent) = self
            .font_context
            .ascent_descent(1000.0)
            .unwrap_or((800.0, -200.0));

        let mut font_descriptor = Dictionary::new();
        font_descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
        font_descriptor.set("FontName", Object::Name(base_font.clone().into_bytes()));
        font_descriptor.set("Flags", Object::Integer(32));
        font_descriptor.set(
            "FontBBox",
            Object::Array(vec![
                Object::Integer(-200),
                Object::Real(descent),
                Object::Integer(1200),
                Object::Real(ascent),
            ]),
        );
        font_descriptor.set("ItalicAngle", Object::Integer(0));
        font_descriptor.set("Ascent", Object::Real(ascent));
        font_descriptor.set("Descent", Object::Real(descent));
        font_descriptor.set("CapHeight", Object::Real(ascent * 0.9));
        font_descriptor.set("StemV", Object::Integer(120));
        if let Some(font_file) = self.create_embeddable_font_stream() {
            let font_file_id = self.document.add_object(font_file);
            font_descriptor.set("FontFile2", Object::Reference(font_file_id));
        } else {
            log::warn!(
                "{} is not a TrueType outline font, viewers will substitute it",
                self.font_context.font_name
            );
        }
        let font_descriptor_id = self.document.add_object(Object::Dictionary(font_descriptor));

        let widths = (32u8..=255)
            .map(|code| Object::Real(self.font_context.pdf_width(code)))
            .collect();

        let mut font_dict = Dictionary::new();
        font_dict.set("Type", Object::Name(b"Font".to_vec()));
        font_dict.set("Subtype", Object::Name(b"TrueType".to_vec()));
        font_dict.set("BaseFont", Object::Name(base_font.into_bytes()));
        font_dict.set("FirstChar", Object::Integer(32));
        font_dict.set("LastChar", Object::Integer(255));
        font_dict.set("Widths", Object::Array(widths));
        font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        font_dict.set("FontDescriptor", Object::Reference(font_descriptor_id));

        Ok(self.document.add_object(Object::Dictionary(font_dict)))
    }

    fn create_embeddable_font_stream(&self) -> Option<Object> {
        let data = &self.font_context.font_data;
        // CFF-flavoured OpenType needs FontFile3, not FontFile2.
        if data.len() < 4 || data.starts_with(b"OTTO") {
            return None;
        }
        let mut stream_dict = Dictionary::new();
        stream_dict.set("Length1", Object::Integer(data.len() as i64));
        Some(Object::Stream(Stream::new(stream_dict, data.clone())))
    }

    fn add_debug_guides(&mut self, result: &LayoutResult, origin: Origin) {
        let page = self.options.page;
        let margins = self.options.margins;
        self.stroke_rect(0.0, 0.0, page.width_mm, page.height_mm, (1.0, 1.0, 0.0));
        self.stroke_rect(
            margins.left,
            margins.top,
            page.width_mm - margins.horizontal(),
            page.height_mm - margins.vertical(),
            (1.0, 0.0, 0.0),
        );
        let mut y = origin.y;
        for line in &result.lines {
            self.stroke_rect(origin.x, y, result.width_mm, line.height_mm, (0.0, 0.0, 1.0));
            y += line.height_mm;
        }
    }

    /// Stroke a rectangle given in top-left mm coordinates.
    fn stroke_rect(&mut self, x_mm: f32, y_mm: f32, w_mm: f32, h_mm: f32, rgb: (f32, f32, f32)) {
        let bottom = self.page_height_pt() - mm_to_pt(y_mm + h_mm);
        let ops = &mut self.content.operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("w", vec![Object::Real(0.5)]));
        ops.push(Operation::new(
            "RG",
            vec![Object::Real(rgb.0), Object::Real(rgb.1), Object::Real(rgb.2)],
        ));
        ops.push(Operation::new(
            "re",
            vec![
                Object::Real(mm_to_pt(x_mm)),
                Object::Real(bottom),
                Object::Real(mm_to_pt(w_mm)),
                Object::Real(mm_to_pt(h_mm)),
            ],
        ));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// TJ array with per-pair kerning and tracking, in 1/1000 text space units.
    fn build_tj_array(&mut self, text: &str, size: f32) -> Vec<Object> {
        let chars: Vec<char> = text.chars().map(drawable_char).collect();
        let mut tj = Vec::with_capacity(chars.len() * 2);

        for (i, &ch) in chars.iter().enumerate() {
            let byte = win_ansi_byte(ch).unwrap_or(REPLACEMENT_CHAR as u8);
            tj.push(Object::String(vec![byte], StringFormat::Literal));

            if let Some(&next) = chars.get(i + 1) {
                let mut advance = self.font_context.tracking / 1000.0 * size;
                if let Some(kern) = self.font_context.font.horizontal_kern(ch, next, size) {
                    advance += kern;
                }
                if advance != 0.0 {
                    // Positive TJ numbers move the next glyph left.
                    tj.push(Object::Real(-advance * 1000.0 / size));
                }
            }
        }
        tj
    }

    /// Build the page object around the accumulated content and add it to the tree.
    fn finish_page(&mut self) -> Result<()> {
        let page_id = self.document.new_object_id();
        let page = self.options.page;

        let mut font_dict = Dictionary::new();
        font_dict.set(FONT_RESOURCE, Object::Reference(self.font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_dict));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(mm_to_pt(page.width_mm)),
                Object::Real(mm_to_pt(page.height_mm)),
            ]),
        );

        let content = std::mem::replace(
            &mut self.content,
            Content {
                operations: Vec::new(),
            },
        );
        let content_stream = Stream::new(Dictionary::new(), content.encode()?);
        let content_id = self.document.add_object(content_stream);
        page_dict.set("Contents", Object::Reference(content_id));

        self.document
            .objects
            .insert(page_id, Object::Dictionary(page_dict));
        self.add_page_to_tree(page_id)
    }

    fn add_page_to_tree(&mut self, page_id: ObjectId) -> Result<()> {
        let pages_obj = self.document.get_object_mut(self.pages_id)?;
        if let Object::Dictionary(ref mut pages_dict) = pages_obj {
            let kids = pages_dict.get_mut(b"Kids")?.as_array_mut()?;
            kids.push(Object::Reference(page_id));
            let count = kids.len() as i64;
            pages_dict.set("Count", Object::Integer(count));
            Ok(())
        } else {
            Err(anyhow!("Pages object is not a dictionary"))
        }
    }

    fn save_document(&mut self, output_path: &str) -> Result<()> {
        self.document.compress();
        self.document
            .save(output_path)
            .with_context(|| format!("Failed to save {}", output_path))?;
        Ok(())
    }
}

impl RenderBackend for SignPdfGenerator {
    fn draw_line(&mut self, line: &DrawLine<'_>) -> Result<()> {
        let size = line.font_size_pt as f32;
        let text_width_pt = self
            .font_context
            .with_font_size(size, |ctx| ctx.current_text_width(line.text));
        let cell_x = mm_to_pt(line.x_mm);
        let cell_w = mm_to_pt(line.width_mm);
        let x = match line.align {
            Align::Left => cell_x,
            Align::Center => cell_x + (cell_w - text_width_pt) / 2.0,
            Align::Right => cell_x + cell_w - text_width_pt,
        };

        let ascent = self
            .font_context
            .ascent_descent(size)
            .map(|(ascent, _)| ascent)
            .unwrap_or(size * 0.8);
        let baseline = self.page_height_pt() - (mm_to_pt(line.y_mm) + ascent);

        let tj = self.build_tj_array(line.text, size);
        let ops = &mut self.content.operations;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(size),
            ],
        ));
        ops.push(Operation::new(
            "Tm",
            vec![
                Object::Real(1.0),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(1.0),
                Object::Real(x),
                Object::Real(baseline),
            ],
        ));
        ops.push(Operation::new("TJ", vec![Object::Array(tj)]));
        ops.push(Operation::new("ET", vec![]));
        Ok(())
    }
}

fn mm_to_pt(mm: f32) -> f32 {
    mm / PT_TO_MM
}

fn sanitize_pdf_font_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else if ch.is_whitespace() {
            out.push('-');
        }
    }
    if out.is_empty() {
        "SignFont".to_string()
    } else {
        out
    }
}

/// Create a sign generator
pub fn create_sign_generator(font_context: FontContext, options: SignOptions) -> SignPdfGenerator {
    SignPdfGenerator::new(font_context, options)
}

/// Render one sign with the first available display font and default options.
pub fn create_sign_pdf(text: &str, output_path: &str) -> Result<SignReport> {
    let font_context = crate::fonts::initialize_fonts()?;
    create_sign_generator(font_context, SignOptions::default()).generate_sign(text, output_path)
}

/// Render one sign with an explicit font and options.
pub fn create_sign_pdf_with_context(
    text: &str,
    output_path: &str,
    font_context: &FontContext,
    options: &SignOptions,
) -> Result<SignReport> {
    create_sign_generator(font_context.clone(), options.clone()).generate_sign(text, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Line;
    use crate::metrics::TextMetrics;

    #[derive(Default)]
    struct Recorder {
        lines: Vec<(String, f32, f32, u32)>,
    }

    impl RenderBackend for Recorder {
        fn draw_line(&mut self, line: &DrawLine<'_>) -> Result<()> {
            assert_eq!(line.align, Align::Center);
            self.lines
                .push((line.text.to_string(), line.x_mm, line.y_mm, line.font_size_pt));
            Ok(())
        }
    }

    fn line(text: &str, size: u32, role: Role, height: f32) -> Line {
        Line {
            text: text.to_string(),
            font_size_pt: size,
            role,
            width_mm: 50.0,
            height_mm: height,
        }
    }

    #[test]
    fn driver_stacks_lines_in_order() {
        let result = LayoutResult {
            lines: vec![
                line("Max", 200, Role::Main, 60.0),
                line("&", 110, Role::Connector, 30.0),
                line("Ruby", 200, Role::Main, 60.0),
            ],
            total_height_mm: 150.0,
            width_mm: 120.0,
            diagnostics: Vec::new(),
        };
        let mut recorder = Recorder::default();
        render_block(&mut recorder, &result, Origin { x: 10.0, y: 20.0 }).unwrap();

        assert_eq!(
            recorder.lines,
            vec![
                ("Max".to_string(), 10.0, 20.0, 200),
                ("&".to_string(), 10.0, 80.0, 110),
                ("Ruby".to_string(), 10.0, 110.0, 200),
            ]
        );
    }

    #[test]
    fn file_names_follow_words() {
        assert_eq!(
            sign_file_name("  Max   & Ruby "),
            Some("Max_&_Ruby.pdf".to_string())
        );
        assert_eq!(sign_file_name("AC/DC"), Some("ACDC.pdf".to_string()));
        assert_eq!(sign_file_name("   "), None);
        assert_eq!(sign_file_name("//"), None);
    }

    #[test]
    fn options_json_overrides_page_and_debug() {
        let options = SignOptions::from_json_str(
            r#"{"page": {"width_mm": 297.0, "height_mm": 210.0}, "debug_guides": true}"#,
        )
        .unwrap();
        assert_eq!(options.page, PageSize::A4_LANDSCAPE);
        assert!(options.debug_guides);
        assert_eq!(options.margins, Margins::default());
        assert_eq!(options.tracking, 0.0);

        let spaced = SignOptions::from_json_str(r#"{"tracking": 75.0}"#).unwrap();
        assert_eq!(spaced.tracking, 75.0);
    }

    #[test]
    fn tracking_reaches_measurement() {
        let Ok(font_context) = crate::fonts::initialize_fonts() else {
            return;
        };
        let mut plain = SignPdfGenerator::new(font_context.clone(), SignOptions::default());
        let spaced_options = SignOptions {
            tracking: 200.0,
            ..SignOptions::default()
        };
        let mut spaced = SignPdfGenerator::new(font_context, spaced_options.clone());

        let plain_width = plain.font_context.measure_width("Max & Ruby", 100);
        let spaced_width = spaced.font_context.measure_width("Max & Ruby", 100);
        assert!(spaced_width > plain_width);

        plain.set_options(spaced_options);
        assert_eq!(plain.font_context.measure_width("Max & Ruby", 100), spaced_width);
    }

    #[test]
    fn unencodable_chars_kern_like_their_replacement() {
        let Ok(font_context) = crate::fonts::initialize_fonts() else {
            return;
        };
        let mut generator = SignPdfGenerator::new(font_context, SignOptions::default());
        let substituted = generator.build_tj_array("A\u{4E2D}V", 200.0);
        let replaced = generator.build_tj_array("A?V", 200.0);
        assert_eq!(format!("{:?}", substituted), format!("{:?}", replaced));
    }

    #[test]
    fn font_names_are_pdf_safe() {
        assert_eq!(sanitize_pdf_font_name("DejaVu Sans Bold"), "DejaVu-Sans-Bold");
        assert_eq!(sanitize_pdf_font_name("()"), "SignFont");
    }

    #[test]
    fn writes_a_single_page_pdf() {
        let Ok(font_context) = crate::fonts::initialize_fonts() else {
            return;
        };
        let options = SignOptions {
            debug_guides: true,
            ..SignOptions::default()
        };
        let path = std::env::temp_dir().join("stagecard_max_and_ruby.pdf");
        let path = path.to_string_lossy().to_string();

        let report =
            create_sign_pdf_with_context("Max & Ruby", &path, &font_context, &options).unwrap();
        assert_eq!(report.line_count, 3);
        assert!(!report.overflowed);

        let document = Document::load(&path).unwrap();
        assert_eq!(document.get_pages().len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn blank_text_writes_nothing() {
        let Ok(font_context) = crate::fonts::initialize_fonts() else {
            return;
        };
        let path = std::env::temp_dir().join("stagecard_blank.pdf");
        let _ = std::fs::remove_file(&path);
        let report = create_sign_pdf_with_context(
            "   ",
            &path.to_string_lossy(),
            &font_context,
            &SignOptions::default(),
        )
        .unwrap();
        assert_eq!(report.output_path, None);
        assert_eq!(report.line_count, 0);
        assert!(!path.exists());
    }
}
