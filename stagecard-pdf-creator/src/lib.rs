//! Stagecard PDF Creator
//!
//! Fits a performer's name onto a stage card at the largest font size the page
//! allows, demoting connector words ("and", "&", "featuring") to smaller lines,
//! and writes the card as a single-page PDF.

pub mod config;
pub mod fonts;
pub mod layout;
pub mod metrics;
pub mod placement;
pub mod segmenter;
pub mod sign_generator;
pub mod solver;

// Re-export commonly used functions and types
pub use config::{LayoutConfig, Margins, OverflowStrategy, PageSize, VerticalSource};
pub use fonts::FontContext;
pub use layout::{layout, BlockLayoutEngine, Diagnostic, LayoutResult, Line};
pub use metrics::{FontMetrics, TextMetrics};
pub use placement::{placement_origin, Origin};
pub use segmenter::{expand, segment, Role, Segment};
pub use sign_generator::{
    create_sign_pdf, create_sign_pdf_with_context, render_block, sign_file_name, RenderBackend,
    SignOptions, SignPdfGenerator, SignReport,
};
pub use solver::max_font_for_width;

use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};

/// Sign written and fits the page.
pub const SIGN_OK: c_int = 0;
/// Sign written, but the text overflows the page at the minimum font size.
pub const SIGN_OVERFLOW: c_int = 1;
/// Blank text, nothing written.
pub const SIGN_BLANK: c_int = 2;
pub const SIGN_ERROR: c_int = -1;

/// Map a generation outcome to the C return codes above.
pub fn status_code(result: &anyhow::Result<SignReport>) -> c_int {
    match result {
        Ok(report) if report.output_path.is_none() => SIGN_BLANK,
        Ok(report) if report.overflowed => SIGN_OVERFLOW,
        Ok(_) => SIGN_OK,
        Err(e) => {
            log::error!("Sign generation failed: {:#}", e);
            SIGN_ERROR
        }
    }
}

/// Borrow a C string argument, `None` for null pointers.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string valid for `'a`.
pub unsafe fn c_str_arg<'a>(ptr: *const c_char) -> Option<std::borrow::Cow<'a, str>> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy())
    }
}

/// Load fonts and create a sign generator with default options.
#[no_mangle]
pub extern "C" fn init_sign_creator() -> *mut c_void {
    match fonts::initialize_fonts() {
        Ok(font_context) => {
            let generator = SignPdfGenerator::new(font_context, SignOptions::default());
            Box::into_raw(Box::new(generator)) as *mut c_void
        }
        Err(e) => {
            log::error!("Font initialization failed: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Release a generator created by [`init_sign_creator`].
#[no_mangle]
pub extern "C" fn cleanup_sign_creator(context: *mut c_void) {
    if !context.is_null() {
        unsafe {
            let _ = Box::from_raw(context as *mut SignPdfGenerator);
        }
    }
}

/// Replace the generator's page, margins and font range.
#[no_mangle]
pub extern "C" fn set_sign_options(
    context: *mut c_void,
    page_width_mm: f32,
    page_height_mm: f32,
    margin_mm: f32,
    font_min_pt: u32,
    font_max_pt: u32,
    debug_guides: c_int,
) -> c_int {
    if context.is_null() {
        return SIGN_ERROR;
    }

    let generator = unsafe { &mut *(context as *mut SignPdfGenerator) };
    let mut options = generator.options().clone();
    options.page = PageSize::new(page_width_mm, page_height_mm);
    options.margins = Margins::uniform(margin_mm.max(0.0));
    options.layout.font_min_pt = font_min_pt;
    options.layout.font_max_pt = font_max_pt;
    options.layout = options.layout.validated();
    options.debug_guides = debug_guides != 0;
    generator.set_options(options);

    SIGN_OK
}

/// Render `text` to `output_path` with the generator's options.
#[no_mangle]
pub extern "C" fn generate_sign_pdf(
    context: *mut c_void,
    text: *const c_char,
    output_path: *const c_char,
) -> c_int {
    if context.is_null() {
        return SIGN_ERROR;
    }
    let (Some(text), Some(output_path)) = (unsafe { c_str_arg(text) }, unsafe { c_str_arg(output_path) })
    else {
        return SIGN_ERROR;
    };

    let generator = unsafe { &mut *(context as *mut SignPdfGenerator) };
    status_code(&generator.generate_sign(&text, &output_path))
}
