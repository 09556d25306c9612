//! Stagecard DLL
//!
//! C ABI bridge for hosts that render stage cards: one call per name.

use std::os::raw::{c_char, c_int};

use stagecard_pdf_creator::{
    c_str_arg, status_code, FontContext, Margins, PageSize, SignOptions, SIGN_BLANK, SIGN_ERROR,
    SIGN_OK, SIGN_OVERFLOW,
};

/// Build options from an optional JSON document, then apply the explicit page
/// size and margin when they are positive.
fn resolve_options(
    options_json: Option<&str>,
    page_width_mm: f32,
    page_height_mm: f32,
    margin_mm: f32,
) -> anyhow::Result<SignOptions> {
    let mut options = match options_json {
        Some(json) if !json.trim().is_empty() => SignOptions::from_json_str(json)?,
        _ => SignOptions::default(),
    };
    if page_width_mm > 0.0 && page_height_mm > 0.0 {
        options.page = PageSize::new(page_width_mm, page_height_mm);
    }
    if margin_mm >= 0.0 {
        options.margins = Margins::uniform(margin_mm);
    }
    Ok(options)
}

/// Render one name to a single-page PDF.
///
/// Non-positive page dimensions keep the 11x17 landscape default; a negative
/// margin keeps the default margin. `options_json` may be null.
///
/// Returns 0 on success, 1 when the sign was written but overflows the page,
/// 2 for blank text (nothing written) and -1 on failure.
#[no_mangle]
pub extern "C" fn generate_sign_pdf_ffi(
    text: *const c_char,
    output_path: *const c_char,
    page_width_mm: f32,
    page_height_mm: f32,
    margin_mm: f32,
    options_json: *const c_char,
) -> c_int {
    let (Some(text), Some(output_path)) = (unsafe { c_str_arg(text) }, unsafe { c_str_arg(output_path) })
    else {
        return SIGN_ERROR;
    };
    let options_json = unsafe { c_str_arg(options_json) };

    let options = match resolve_options(options_json.as_deref(), page_width_mm, page_height_mm, margin_mm) {
        Ok(options) => options,
        Err(e) => {
            log::error!("Invalid sign options: {:#}", e);
            return SIGN_ERROR;
        }
    };

    let font_context = match FontContext::initialize_fonts() {
        Ok(fc) => fc,
        Err(e) => {
            log::error!("Font initialization failed: {}", e);
            return SIGN_ERROR;
        }
    };

    status_code(&stagecard_pdf_creator::create_sign_pdf_with_context(
        &text,
        &output_path,
        &font_context,
        &options,
    ))
}

/// Lay out one name without writing anything.
///
/// On success writes the line count, the shared main font size (0 if the block
/// has only connector lines) and the block height in mm through the out
/// pointers, any of which may be null. Return codes match
/// [`generate_sign_pdf_ffi`].
#[no_mangle]
pub extern "C" fn layout_sign_ffi(
    text: *const c_char,
    page_width_mm: f32,
    page_height_mm: f32,
    margin_mm: f32,
    out_line_count: *mut c_int,
    out_main_font_pt: *mut c_int,
    out_total_height_mm: *mut f32,
) -> c_int {
    let Some(text) = (unsafe { c_str_arg(text) }) else {
        return SIGN_ERROR;
    };

    let options = match resolve_options(None, page_width_mm, page_height_mm, margin_mm) {
        Ok(options) => options,
        Err(e) => {
            log::error!("Invalid sign options: {:#}", e);
            return SIGN_ERROR;
        }
    };
    let mut font_context = match FontContext::initialize_fonts() {
        Ok(fc) => fc,
        Err(e) => {
            log::error!("Font initialization failed: {}", e);
            return SIGN_ERROR;
        }
    };
    font_context.tracking = options.tracking;

    let result = stagecard_pdf_creator::layout(
        &mut font_context,
        &text,
        options.page.width_mm,
        options.page.height_mm,
        &options.margins,
        &options.layout,
    );

    unsafe {
        if !out_line_count.is_null() {
            *out_line_count = result.lines.len() as c_int;
        }
        if !out_main_font_pt.is_null() {
            *out_main_font_pt = result.main_font_pt().unwrap_or(0) as c_int;
        }
        if !out_total_height_mm.is_null() {
            *out_total_height_mm = result.total_height_mm;
        }
    }

    if result.is_empty() {
        SIGN_BLANK
    } else if result.overflowed() {
        SIGN_OVERFLOW
    } else {
        SIGN_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn null_arguments_are_rejected() {
        let path = CString::new("out.pdf").unwrap();
        assert_eq!(
            generate_sign_pdf_ffi(std::ptr::null(), path.as_ptr(), 0.0, 0.0, -1.0, std::ptr::null()),
            SIGN_ERROR
        );
        assert_eq!(
            layout_sign_ffi(
                std::ptr::null(),
                0.0,
                0.0,
                -1.0,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut()
            ),
            SIGN_ERROR
        );
    }

    #[test]
    fn null_output_path_is_rejected() {
        let text = CString::new("Max & Ruby").unwrap();
        assert_eq!(
            generate_sign_pdf_ffi(text.as_ptr(), std::ptr::null(), 0.0, 0.0, -1.0, std::ptr::null()),
            SIGN_ERROR
        );
    }

    #[test]
    fn lossy_text_is_accepted() {
        if FontContext::initialize_fonts().is_err() {
            return;
        }
        // Invalid UTF-8 is replaced rather than rejected.
        let text = CString::new(vec![b'M', b'a', b'x', 0xFF]).unwrap();
        let mut lines: c_int = 0;
        let code = layout_sign_ffi(
            text.as_ptr(),
            0.0,
            0.0,
            -1.0,
            &mut lines,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        );
        assert_eq!(code, SIGN_OK);
        assert_eq!(lines, 1);
    }

    #[test]
    fn explicit_page_overrides_json() {
        let options = resolve_options(
            Some(r#"{"debug_guides": true, "margins": {"top": 5, "right": 5, "bottom": 5, "left": 5}}"#),
            297.0,
            210.0,
            -1.0,
        )
        .unwrap();
        assert_eq!(options.page, PageSize::A4_LANDSCAPE);
        assert_eq!(options.margins, Margins::uniform(5.0));
        assert!(options.debug_guides);
    }

    #[test]
    fn defaults_when_nothing_is_given() {
        let options = resolve_options(None, 0.0, 0.0, -1.0).unwrap();
        assert_eq!(options, SignOptions::default());
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(resolve_options(Some("{"), 0.0, 0.0, -1.0).is_err());
    }

    #[test]
    fn blank_layout_reports_zero_lines() {
        if FontContext::initialize_fonts().is_err() {
            return;
        }
        let text = CString::new("   ").unwrap();
        let mut lines: c_int = -1;
        let code = layout_sign_ffi(
            text.as_ptr(),
            0.0,
            0.0,
            -1.0,
            &mut lines,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        );
        assert_eq!(code, SIGN_BLANK);
        assert_eq!(lines, 0);
    }
}
