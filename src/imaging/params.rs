//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`registry`](super::registry) validators (which turn
//! loosely typed arguments into these) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping codecs
//! (e.g. for testing with a mock) without changing validation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Encode quality (0–100, default 75). Clamped on construction.
//! - [`RelativeCrop`] / [`CropRect`]: A crop before and after conversion to pixels.
//! - [`ScaleBounds`]: Optional `maxwidth`/`maxheight` for scale-to-fit.
//! - [`Resampling`]: Which resize filter a scale step asks for.
//! - [`Filter`]: Every single-image effect primitive the codec offers.

/// Quality setting for output encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub const DEFAULT: u8 = 75;

    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Crop corners relative to the image, each in `[0.0, 1.0]`, with
/// `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeCrop {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Absolute crop rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Bounds for scale-to-fit. `None` (or a non-positive value) means "keep the
/// current dimension".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaleBounds {
    pub max_width: Option<i64>,
    pub max_height: Option<i64>,
}

/// Resize filter selection.
///
/// `scale` trades speed for quality; `thumbnail` trades quality for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    HighQuality,
    Fast,
}

/// Single-image effect primitives.
///
/// Numeric payloads are already validated and clamped by the registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter {
    Blur,
    Sharpen,
    Unsharpen,
    Despeckle,
    Enhance,
    Equalize,
    Normalize,
    Negate,
    Dither,
    Flip,
    Flop,
    Grayscale,
    /// Invert channels above `percent` of full intensity.
    Solarize { percent: f64 },
    /// Black/white split at a luma `level` in 0–256.
    Threshold { level: f64 },
    /// Sepia tone blended in at `percent`.
    Sepia { percent: f64 },
    OilPaint { radius: u32 },
    Swirl { degrees: f64 },
    /// One contrast step, raising (`sharpen`) or lowering it.
    Contrast { sharpen: bool },
}

impl Filter {
    /// Name used in logs and codec error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Blur => "blur",
            Filter::Sharpen => "sharpen",
            Filter::Unsharpen => "unsharpen",
            Filter::Despeckle => "despeckle",
            Filter::Enhance => "enhance",
            Filter::Equalize => "equalize",
            Filter::Normalize => "normalize",
            Filter::Negate => "negate",
            Filter::Dither => "dither",
            Filter::Flip => "flip",
            Filter::Flop => "flop",
            Filter::Grayscale => "grayscale",
            Filter::Solarize { .. } => "solarize",
            Filter::Threshold { .. } => "threshold",
            Filter::Sepia { .. } => "sepia",
            Filter::OilPaint { .. } => "oilpaint",
            Filter::Swirl { .. } => "swirl",
            Filter::Contrast { .. } => "contrast",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(-5).value(), 0);
        assert_eq!(Quality::new(0).value(), 0);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
        assert_eq!(Quality::new(i64::MAX).value(), 100);
    }

    #[test]
    fn quality_default_is_75() {
        assert_eq!(Quality::default().value(), 75);
    }

    #[test]
    fn filter_names_match_payload_variants() {
        assert_eq!(Filter::Solarize { percent: 50.0 }.name(), "solarize");
        assert_eq!(Filter::Contrast { sharpen: false }.name(), "contrast");
        assert_eq!(Filter::OilPaint { radius: 3 }.name(), "oilpaint");
    }
}
