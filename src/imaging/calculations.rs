//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions after fitting `original` into `max_width`, keeping the aspect ratio.
///
/// Returns `None` when the image is already narrow enough; images are never
/// upscaled. The height is rounded and never drops below one pixel.
///
/// # Examples
/// ```
/// # use site2zim::imaging::scaled_dimensions;
/// // 4000x3000 into 1920 → 1920x1440
/// assert_eq!(scaled_dimensions((4000, 3000), 1920), Some((1920, 1440)));
///
/// // Already narrower than the limit
/// assert_eq!(scaled_dimensions((800, 600), 1920), None);
/// ```
pub fn scaled_dimensions(original: (u32, u32), max_width: u32) -> Option<(u32, u32)> {
    let (orig_w, orig_h) = original;
    if orig_w <= max_width || max_width == 0 {
        return None;
    }
    let ratio = max_width as f64 / orig_w as f64;
    let height = ((orig_h as f64 * ratio).round() as u32).max(1);
    Some((max_width, height))
}

/// Bytes saved by replacing `original` with `optimized`; zero if it grew.
pub fn bytes_saved(original: u64, optimized: u64) -> u64 {
    original.saturating_sub(optimized)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // scaled_dimensions tests
    // =========================================================================

    #[test]
    fn landscape_wider_than_limit() {
        // 4000x3000 (4:3) → 1920 wide, 1440 high
        assert_eq!(scaled_dimensions((4000, 3000), 1920), Some((1920, 1440)));
    }

    #[test]
    fn portrait_wider_than_limit() {
        // 3000x4000 → 1920 wide, 2560 high
        assert_eq!(scaled_dimensions((3000, 4000), 1920), Some((1920, 2560)));
    }

    #[test]
    fn exactly_at_limit_is_untouched() {
        assert_eq!(scaled_dimensions((1920, 1080), 1920), None);
    }

    #[test]
    fn never_upscales() {
        assert_eq!(scaled_dimensions((640, 480), 1920), None);
    }

    #[test]
    fn height_rounds_to_nearest() {
        // 1000x333 → 500 wide, 166.5 → 167
        assert_eq!(scaled_dimensions((1000, 333), 500), Some((500, 167)));
    }

    #[test]
    fn extreme_panorama_keeps_one_pixel_height() {
        assert_eq!(scaled_dimensions((100_000, 10), 100), Some((100, 1)));
    }

    #[test]
    fn zero_limit_disables_resizing() {
        assert_eq!(scaled_dimensions((4000, 3000), 0), None);
    }

    // =========================================================================
    // bytes_saved tests
    // =========================================================================

    #[test]
    fn savings_are_saturating() {
        assert_eq!(bytes_saved(1000, 400), 600);
        assert_eq!(bytes_saved(400, 1000), 0);
    }
}
