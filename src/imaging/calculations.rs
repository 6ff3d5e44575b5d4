//! Pure calculation functions for transformation geometry and numeric clamps.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{CropRect, RelativeCrop};
use thiserror::Error;

/// Calculate the scale-to-fit dimensions for a `scale`/`thumbnail` step.
///
/// Bounds that are absent or `<= 0` default to the current dimension. The
/// width bound is applied first (shrinking both sides), then the height bound
/// is checked against the *already shrunk* height and applied to both sides
/// again. The two factors are applied one after the other rather than taking
/// the smaller of two factors computed against the original size; output
/// dimensions depend on that order, so it is kept as is.
///
/// Results are floored, with a floor of 1px per side so a degenerate ratio
/// never asks the codec for an empty image.
///
/// # Examples
/// ```
/// # use image_alter::imaging::calculate_scale_to_fit;
/// // 400x200 with maxwidth 100 → 100x50
/// assert_eq!(calculate_scale_to_fit((400, 200), Some(100), None), (100, 50));
///
/// // Already fits → unchanged
/// assert_eq!(calculate_scale_to_fit((400, 200), Some(800), Some(800)), (400, 200));
/// ```
pub fn calculate_scale_to_fit(
    current: (u32, u32),
    max_width: Option<i64>,
    max_height: Option<i64>,
) -> (u32, u32) {
    let (cur_w, cur_h) = current;
    let max_w = max_width.filter(|&v| v > 0).map_or(cur_w as f64, |v| v as f64);
    let max_h = max_height.filter(|&v| v > 0).map_or(cur_h as f64, |v| v as f64);

    let mut w = cur_w as f64;
    let mut h = cur_h as f64;

    // Width-driven shrink. Multiply before dividing so exact ratios stay exact.
    if w > max_w {
        h = h * max_w / w;
        w = max_w;
    }

    // Height-driven shrink on the squished pair.
    if h > max_h {
        w = w * max_h / h;
        h = max_h;
    }

    ((w.floor() as u32).max(1), (h.floor() as u32).max(1))
}

/// A crop whose rectangle has zero or negative area after clamping.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "crop rectangle [{x1}, {y1}, {x2}, {y2}] has no area (requires x1 < x2 and y1 < y2)"
)]
pub struct DegenerateCrop {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Clamp relative crop coordinates into `[0.0, 1.0]` and reject rectangles
/// that are empty or inverted.
///
/// Inverted rectangles are never silently swapped.
pub fn normalize_crop(coords: [f64; 4]) -> Result<RelativeCrop, DegenerateCrop> {
    let [x1, y1, x2, y2] = coords.map(|c| c.clamp(0.0, 1.0));

    if x1 >= x2 || y1 >= y2 {
        return Err(DegenerateCrop { x1, y1, x2, y2 });
    }

    Ok(RelativeCrop { x1, y1, x2, y2 })
}

/// Convert a relative crop into a pixel rectangle on an image of the given
/// dimensions.
///
/// Origin and extent are rounded independently, then trimmed so the rectangle
/// is at least 1x1 and stays inside the image.
///
/// # Examples
/// ```
/// # use image_alter::imaging::{calculate_crop_rect, normalize_crop};
/// let crop = normalize_crop([0.25, 0.25, 0.75, 0.75]).unwrap();
/// let rect = calculate_crop_rect(&crop, (400, 200));
/// assert_eq!((rect.x, rect.y, rect.width, rect.height), (100, 50, 200, 100));
/// ```
pub fn calculate_crop_rect(crop: &RelativeCrop, dims: (u32, u32)) -> CropRect {
    let (w, h) = dims;
    let (wf, hf) = (w as f64, h as f64);

    let x = ((crop.x1 * wf).round() as u32).min(w.saturating_sub(1));
    let y = ((crop.y1 * hf).round() as u32).min(h.saturating_sub(1));
    let width = ((crop.x2 - crop.x1) * wf).round() as u32;
    let height = ((crop.y2 - crop.y1) * hf).round() as u32;

    CropRect {
        x,
        y,
        width: width.clamp(1, (w - x).max(1)),
        height: height.clamp(1, (h - y).max(1)),
    }
}

/// Clamp a value into `[min, max]`.
pub fn clamp_to_range(value: f64, min: f64, max: f64) -> f64 {
    value.clamp(min, max)
}

/// Split a contrast intensity into a direction and an iteration count.
///
/// The intensity is rounded to a whole number and clamped to a magnitude of
/// `max_magnitude`. Positive values sharpen (raise contrast), negative values
/// dull it; the magnitude is how many times the primitive runs.
///
/// # Returns
/// * `(sharpen, iterations)`
pub fn contrast_steps(intensity: f64, max_magnitude: u32) -> (bool, u32) {
    let bound = max_magnitude as f64;
    let clamped = intensity.round().clamp(-bound, bound);
    (clamped >= 0.0, clamped.abs() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_scale_to_fit tests
    // =========================================================================

    #[test]
    fn scale_width_bound_only() {
        // 400x200, maxwidth 100 → 100x50
        assert_eq!(calculate_scale_to_fit((400, 200), Some(100), None), (100, 50));
    }

    #[test]
    fn scale_height_bound_only() {
        // 400x200, maxheight 50 → 100x50
        assert_eq!(calculate_scale_to_fit((400, 200), None, Some(50)), (100, 50));
    }

    #[test]
    fn scale_no_bounds_is_identity() {
        assert_eq!(calculate_scale_to_fit((640, 480), None, None), (640, 480));
    }

    #[test]
    fn scale_non_positive_bounds_default_to_current() {
        assert_eq!(calculate_scale_to_fit((640, 480), Some(0), Some(-5)), (640, 480));
    }

    #[test]
    fn scale_never_enlarges() {
        assert_eq!(calculate_scale_to_fit((100, 50), Some(1000), Some(1000)), (100, 50));
    }

    #[test]
    fn scale_applies_width_then_height_sequentially() {
        // 1000x800, maxwidth 500 → 500x400; then maxheight 300 on the
        // squished height → 375x300.
        assert_eq!(calculate_scale_to_fit((1000, 800), Some(500), Some(300)), (375, 300));
    }

    #[test]
    fn scale_height_check_uses_squished_height() {
        // 1000x400, maxwidth 500 → 500x200. maxheight 300 is no longer
        // exceeded, so the second shrink never runs.
        assert_eq!(calculate_scale_to_fit((1000, 400), Some(500), Some(300)), (500, 200));
    }

    #[test]
    fn scale_floors_fractional_results() {
        // 333x100, maxwidth 100 → height 100*100/333 = 30.03 → 30
        assert_eq!(calculate_scale_to_fit((333, 100), Some(100), None), (100, 30));
        // 300x199, maxwidth 100 → height 66.33 → 66
        assert_eq!(calculate_scale_to_fit((300, 199), Some(100), None), (100, 66));
    }

    #[test]
    fn scale_width_formula_holds_for_many_sizes() {
        for (w, h, mw) in [(400, 200, 100), (1920, 1080, 640), (7, 3, 2), (5000, 17, 999)] {
            let (out_w, out_h) = calculate_scale_to_fit((w, h), Some(mw), None);
            assert_eq!(out_w, mw as u32);
            let expected = (h as f64 * mw as f64 / w as f64).floor().max(1.0) as u32;
            assert!(out_h.abs_diff(expected) <= 1, "{w}x{h} mw={mw} → {out_h}");
        }
    }

    #[test]
    fn scale_extreme_ratio_keeps_one_pixel() {
        assert_eq!(calculate_scale_to_fit((10000, 1), Some(10), None), (10, 1));
    }

    // =========================================================================
    // normalize_crop / calculate_crop_rect tests
    // =========================================================================

    #[test]
    fn crop_center_quarter() {
        let crop = normalize_crop([0.25, 0.25, 0.75, 0.75]).unwrap();
        let rect = calculate_crop_rect(&crop, (400, 200));
        assert_eq!(
            rect,
            CropRect {
                x: 100,
                y: 50,
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn crop_coordinates_clamped() {
        let crop = normalize_crop([-1.0, -0.5, 2.0, 1.5]).unwrap();
        assert_eq!(
            crop,
            RelativeCrop {
                x1: 0.0,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0
            }
        );
        let rect = calculate_crop_rect(&crop, (300, 150));
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 300, 150));
    }

    #[test]
    fn crop_inverted_x_rejected() {
        let err = normalize_crop([0.8, 0.0, 0.2, 1.0]).unwrap_err();
        assert_eq!(err.x1, 0.8);
        assert_eq!(err.x2, 0.2);
    }

    #[test]
    fn crop_zero_area_rejected() {
        assert!(normalize_crop([0.5, 0.0, 0.5, 1.0]).is_err());
        assert!(normalize_crop([0.0, 0.3, 1.0, 0.3]).is_err());
    }

    #[test]
    fn crop_degenerate_after_clamping_rejected() {
        // Both x values clamp to 1.0
        assert!(normalize_crop([1.5, 0.0, 3.0, 1.0]).is_err());
        // Both y values clamp to 0.0
        assert!(normalize_crop([0.0, -2.0, 1.0, -1.0]).is_err());
    }

    #[test]
    fn crop_tiny_region_is_at_least_one_pixel() {
        let crop = normalize_crop([0.5, 0.5, 0.5001, 0.5001]).unwrap();
        let rect = calculate_crop_rect(&crop, (100, 100));
        assert_eq!((rect.width, rect.height), (1, 1));
    }

    #[test]
    fn crop_rect_stays_inside_image() {
        let crop = normalize_crop([0.999, 0.0, 1.0, 1.0]).unwrap();
        let rect = calculate_crop_rect(&crop, (10, 10));
        assert!(rect.x + rect.width <= 10);
        assert_eq!(rect.width, 1);
    }

    // =========================================================================
    // numeric clamps
    // =========================================================================

    #[test]
    fn contrast_positive_sharpens() {
        assert_eq!(contrast_steps(3.0, 10), (true, 3));
    }

    #[test]
    fn contrast_negative_dulls() {
        assert_eq!(contrast_steps(-4.0, 10), (false, 4));
    }

    #[test]
    fn contrast_magnitude_clamped() {
        assert_eq!(contrast_steps(55.0, 10), (true, 10));
        assert_eq!(contrast_steps(-55.0, 10), (false, 10));
    }

    #[test]
    fn contrast_rounds_fractional_intensity() {
        assert_eq!(contrast_steps(2.6, 10), (true, 3));
        assert_eq!(contrast_steps(0.2, 10), (true, 0));
    }

    #[test]
    fn clamp_to_range_bounds() {
        assert_eq!(clamp_to_range(300.0, 0.0, 256.0), 256.0);
        assert_eq!(clamp_to_range(-1.0, 0.0, 100.0), 0.0);
        assert_eq!(clamp_to_range(42.0, 0.0, 100.0), 42.0);
    }
}
