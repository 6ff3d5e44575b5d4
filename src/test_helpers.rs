//! Shared test utilities.
//!
//! Synthetic images for codec and pipeline tests. Nothing here touches
//! fixtures on disk; every image is generated and written into the caller's
//! temp directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = write_test_image(tmp.path(), "in.png", 400, 200);
//! ```

use image::{DynamicImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Pixel sources
// =========================================================================

/// An opaque RGBA gradient: red rises left to right, green top to bottom.
///
/// Every row and column differs, so flips, crops and rotations are visible.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgba([r, g, 128, 255])
    });
    DynamicImage::ImageRgba8(img)
}

// =========================================================================
// Files
// =========================================================================

/// Write a gradient image into `dir`, format chosen by `name`'s extension.
///
/// JPEG is written as RGB since the encoder has no alpha channel.
pub fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = gradient(width, height);
    let is_jpeg = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jpg" | "jpeg")
    );
    let result = if is_jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8()).save(&path)
    } else {
        img.save(&path)
    };
    result.unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}
