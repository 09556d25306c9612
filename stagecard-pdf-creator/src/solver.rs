//! Largest font size that keeps a string inside a width

use crate::config::LayoutConfig;
use crate::metrics::TextMetrics;

/// Largest integer size in `[font_min_pt, font_max_pt]` at which `text` is at
/// most `max_width_mm` wide, or `font_min_pt` if nothing fits.
///
/// A coarse scan in `font_step_pt` strides brackets the answer, then a binary
/// search inside the bracket finds the exact size.
pub fn max_font_for_width(
    metrics: &mut dyn TextMetrics,
    text: &str,
    max_width_mm: f32,
    config: &LayoutConfig,
) -> u32 {
    let max_width = if max_width_mm.is_nan() || max_width_mm <= 0.0 {
        config.min_width_mm
    } else {
        max_width_mm
    };
    let font_min = config.font_min_pt;
    let font_max = config.font_max_pt.max(font_min);
    let step = config.font_step_pt.max(1);

    let mut fits = |size: u32| metrics.measure_width(text, size) <= max_width;

    if !fits(font_min) {
        log::debug!(
            "{:?} does not fit {:.1} mm even at {} pt",
            text,
            max_width,
            font_min
        );
        return font_min;
    }

    // Coarse: `lo` always fits, `hi` is the first stride that does not.
    let mut lo = font_min;
    let hi = loop {
        if lo >= font_max {
            return font_max;
        }
        let next = lo.saturating_add(step).min(font_max);
        if !fits(next) {
            break next;
        }
        lo = next;
    };

    // Refine within (lo, hi).
    let mut lo = lo;
    let mut hi = hi;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    log::debug!("{:?} fits {:.1} mm at {} pt", text, max_width, lo);
    lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PT_TO_MM;
    use crate::metrics::test_support::FixedAdvanceMetrics;
    use proptest::prelude::*;

    #[test]
    fn exact_fit_is_found() {
        let config = LayoutConfig::default();
        let mut m = FixedAdvanceMetrics::new();
        // 5 chars * 0.6 em = 3 em; 3 em at 100 pt.
        let width = 3.0 * 100.0 * PT_TO_MM;
        let size = max_font_for_width(&mut m, "Hello", width + 0.001, &config);
        assert_eq!(size, 100);
    }

    #[test]
    fn caps_at_font_max() {
        let config = LayoutConfig::default();
        let mut m = FixedAdvanceMetrics::new();
        assert_eq!(
            max_font_for_width(&mut m, "x", 10_000.0, &config),
            config.font_max_pt
        );
    }

    #[test]
    fn floors_at_font_min_when_nothing_fits() {
        let config = LayoutConfig::default();
        let mut m = FixedAdvanceMetrics::new();
        let long = "W".repeat(500);
        assert_eq!(
            max_font_for_width(&mut m, &long, 50.0, &config),
            config.font_min_pt
        );
    }

    #[test]
    fn non_positive_width_is_clamped() {
        let config = LayoutConfig::default();
        let mut m = FixedAdvanceMetrics::new();
        assert_eq!(
            max_font_for_width(&mut m, "Band", -20.0, &config),
            config.font_min_pt
        );
        assert_eq!(
            max_font_for_width(&mut m, "Band", 0.0, &config),
            config.font_min_pt
        );
    }

    #[test]
    fn measurement_count_is_bounded() {
        let config = LayoutConfig::default();
        let mut m = FixedAdvanceMetrics::new();
        max_font_for_width(&mut m, "Ruby", 300.0, &config);
        let coarse = (config.font_max_pt - config.font_min_pt) / config.font_step_pt + 2;
        assert!(m.calls as u32 <= coarse + 8, "{} calls", m.calls);
    }

    #[test]
    fn unit_step_still_exact() {
        let config = LayoutConfig {
            font_step_pt: 1,
            ..LayoutConfig::default()
        };
        let mut m = FixedAdvanceMetrics::new();
        let width = 4.0 * 0.6 * 77.0 * PT_TO_MM + 0.001;
        assert_eq!(max_font_for_width(&mut m, "Ruby", width, &config), 77);
    }

    proptest! {
        #[test]
        fn result_is_maximal(len in 1usize..40, width in 5.0f32..500.0) {
            let config = LayoutConfig::default();
            let mut m = FixedAdvanceMetrics::new();
            let text = "M".repeat(len);
            let size = max_font_for_width(&mut m, &text, width, &config);
            prop_assert!(size >= config.font_min_pt && size <= config.font_max_pt);
            if m.measure_width(&text, size) <= width {
                if size < config.font_max_pt {
                    prop_assert!(m.measure_width(&text, size + 1) > width);
                }
            } else {
                prop_assert_eq!(size, config.font_min_pt);
            }
        }

        #[test]
        fn longer_text_never_gets_larger_font(len in 1usize..30, extra in 1usize..10, width in 5.0f32..500.0) {
            let config = LayoutConfig::default();
            let mut m = FixedAdvanceMetrics::new();
            let short = "a".repeat(len);
            let long = "a".repeat(len + extra);
            let short_size = max_font_for_width(&mut m, &short, width, &config);
            let long_size = max_font_for_width(&mut m, &long, width, &config);
            prop_assert!(long_size <= short_size);
        }
    }
}
