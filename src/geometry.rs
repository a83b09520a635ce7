//! Page geometry: named paper sizes to device pixel dimensions.

use crate::options::{Orientation, PageSize};

/// CSS reference pixel density: 96 dpi over 25.4 mm per inch.
pub const PX_PER_MM: f64 = 96.0 / 25.4;

const MM_PER_INCH: f64 = 25.4;

/// Physical dimensions of a page size in millimeters, portrait orientation.
pub fn page_size_mm(size: PageSize) -> (f64, f64) {
    match size {
        PageSize::A4 => (210.0, 297.0),
        PageSize::A3 => (297.0, 420.0),
        PageSize::Letter => (216.0, 279.0),
        PageSize::Legal => (216.0, 356.0),
        PageSize::Tabloid => (279.0, 432.0),
    }
}

/// Pixel dimensions for a page size and orientation.
///
/// Width and height are swapped for landscape before the millimeter to
/// pixel conversion, so `page_pixels(s, Landscape).0 == page_pixels(s, Portrait).1`
/// holds exactly.
pub fn page_pixels(size: PageSize, orientation: Orientation) -> (u32, u32) {
    let (w_mm, h_mm) = oriented_mm(size, orientation);
    ((w_mm * PX_PER_MM).round() as u32, (h_mm * PX_PER_MM).round() as u32)
}

/// Page dimensions in inches, as expected by Chrome's print settings.
pub fn page_inches(size: PageSize, orientation: Orientation) -> (f64, f64) {
    let (w_mm, h_mm) = oriented_mm(size, orientation);
    (w_mm / MM_PER_INCH, h_mm / MM_PER_INCH)
}

fn oriented_mm(size: PageSize, orientation: Orientation) -> (f64, f64) {
    let (w, h) = page_size_mm(size);
    match orientation {
        Orientation::Portrait => (w, h),
        Orientation::Landscape => (h, w),
    }
}

/// Millimeters to pixels with the fixed density multiplier.
pub fn mm_to_px(mm: f64) -> f64 {
    mm * PX_PER_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_portrait_pixels() {
        let (w, h) = page_pixels(PageSize::A4, Orientation::Portrait);
        assert_eq!((w, h), (794, 1123));
    }

    #[test]
    fn test_landscape_transposes_every_size() {
        for size in PageSize::ALL {
            let portrait = page_pixels(size, Orientation::Portrait);
            let landscape = page_pixels(size, Orientation::Landscape);
            assert_eq!(landscape.0, portrait.1, "{size:?} width");
            assert_eq!(landscape.1, portrait.0, "{size:?} height");
        }
    }

    #[test]
    fn test_portrait_is_taller_than_wide() {
        for size in PageSize::ALL {
            let (w, h) = page_pixels(size, Orientation::Portrait);
            assert!(h > w, "{size:?} should be taller than wide in portrait");
        }
    }

    #[test]
    fn test_page_inches_matches_mm() {
        let (w_in, h_in) = page_inches(PageSize::Letter, Orientation::Portrait);
        assert!((w_in - 216.0 / 25.4).abs() < 1e-9);
        assert!((h_in - 279.0 / 25.4).abs() < 1e-9);
    }
}
